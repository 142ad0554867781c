//! Unit tests for buffers and prepared units

use std::sync::Arc;

use host_api::{Buffer, PreparedJavaScript, SourceJavaScriptPreparation, StringBuffer};

#[test]
fn string_buffer_exposes_utf8_bytes() {
    let buf = StringBuffer::new("héllo");
    assert_eq!(buf.size(), 6);
    assert_eq!(buf.as_str(), "héllo");
}

#[test]
fn preparation_shares_buffer() {
    let buf: Arc<dyn Buffer> = Arc::new(StringBuffer::new("1+1"));
    let prep = SourceJavaScriptPreparation::new(buf.clone(), "a.js");
    assert!(Arc::ptr_eq(prep.buffer(), &buf));
    assert_eq!(prep.source_url(), "a.js");
}

#[test]
fn buffers_are_thread_safe() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<StringBuffer>();
    assert_send_sync::<Arc<dyn Buffer>>();
}
