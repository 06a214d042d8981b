use std::cell::RefCell;
use std::rc::Rc;

/// Toast-style user notifications. Backend failures never propagate out
/// of a lifecycle operation; they land here instead.
pub trait Notifier {
    fn notify(&mut self, message: &str);
}

/// Prints notifications to stderr, keeping stdout clean for command output.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, message: &str) {
        eprintln!("! {}", message);
    }
}

/// Collects notifications into a shared buffer. The TUI renders the most
/// recent entry in its footer; tests assert on the full list.
pub struct BufferNotifier {
    messages: Rc<RefCell<Vec<String>>>,
}

impl BufferNotifier {
    pub fn new() -> Self {
        Self {
            messages: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// A read handle that stays valid after the notifier is boxed away.
    pub fn handle(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.messages)
    }
}

impl Notifier for BufferNotifier {
    fn notify(&mut self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_notifier_retains_order() {
        let mut notifier = BufferNotifier::new();
        let handle = notifier.handle();
        notifier.notify("first");
        notifier.notify("second");
        assert_eq!(*handle.borrow(), vec!["first", "second"]);
    }
}
