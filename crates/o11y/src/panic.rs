use std::any::Any;
use std::panic;
use std::thread;

use metrics::counter;
use once_cell::sync::OnceCell;
use tracing::{debug, error};

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Route panics through `tracing` and count them, then defer to the
/// previously installed hook. Returns false if already installed.
pub fn install_hook() -> bool {
    if INSTALLED.set(()).is_err() {
        return false;
    }

    let prev = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let current = thread::current();
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "<unknown>".into());

        error!(
            thread = current.name().unwrap_or("<unnamed>"),
            %location,
            payload = payload_message(info.payload()),
            "panic captured"
        );
        counter!("wirelog_panics_total").increment(1);

        prev(info);
    }));

    debug!("panic hook installed");
    true
}

/// Text of a panic payload, for the two payload types `panic!` produces.
pub fn payload_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_message() {
        let caught = panic::catch_unwind(|| panic!("static text")).unwrap_err();
        assert_eq!(payload_message(caught.as_ref()), "static text");

        let caught = panic::catch_unwind(|| panic!("row {}", 7)).unwrap_err();
        assert_eq!(payload_message(caught.as_ref()), "row 7");

        let caught = panic::catch_unwind(|| panic::panic_any(42_u8)).unwrap_err();
        assert_eq!(payload_message(caught.as_ref()), "<non-string panic payload>");
    }

    #[test]
    fn test_install_once() {
        let first = install_hook();
        assert!(!install_hook());
        assert!(first || INSTALLED.get().is_some());
    }
}
