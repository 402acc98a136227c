//! Greeter demo module
//!
//! Depends on the calculator module at runtime (looked up through the
//! registry, never linked against its instance), emits a persistent
//! `greeted` event stream and offers a delayed, one-shot greeting that
//! completes on a background thread.

use std::rc::Rc;
use std::time::Duration;

use calculator_interface::CalculatorApi;
use modhost_abi::{
    completion, DispatchHandle, Interfaces, InvokeContext, InvokeError, Module, OperationSpec,
    ParamSpec, Pending, SubscriptionId, Subscribers, Value, ValueKind,
};

pub const NAME: &str = "greeter";
pub const VERSION: &str = "1.0.0";

const DEFAULT_DELAY: Duration = Duration::from_millis(10);

pub trait GreeterApi {
    /// Build a greeting and announce it on the `greeted` stream.
    fn greet(&self, name: &str) -> String;

    /// Emit `message` to every `greeted` subscriber.
    fn announce(&self, message: &str);

    fn subscribe_greeted(&self, handler: Box<dyn FnMut(&String)>) -> SubscriptionId;

    fn unsubscribe_greeted(&self, id: SubscriptionId) -> bool;

    /// Greet from a background thread after a short delay.
    ///
    /// The returned [`Pending`] resolves with the greeting. The announcement
    /// is posted to the control thread and happens on the host's next pump.
    fn greet_later(&self, dispatch: &DispatchHandle, name: &str) -> Pending<String>;
}

const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::new(
        "greet",
        ValueKind::Str,
        &[ParamSpec::new("name", ValueKind::Str)],
    ),
    OperationSpec::new(
        "greet_with_sum",
        ValueKind::Str,
        &[
            ParamSpec::new("name", ValueKind::Str),
            ParamSpec::new("a", ValueKind::Int),
            ParamSpec::new("b", ValueKind::Int),
        ],
    ),
    OperationSpec::new(
        "greet_later",
        ValueKind::Unit,
        &[ParamSpec::new("name", ValueKind::Str)],
    ),
    OperationSpec::event("greeted", &[ParamSpec::new("message", ValueKind::Str)]),
];

fn greeting(name: &str) -> String {
    format!("Hello, {}!", name)
}

#[derive(Debug)]
pub struct Greeter {
    greeted: Subscribers<String>,
    delay: Duration,
}

impl Greeter {
    pub fn new() -> Self {
        Self::with_delay(DEFAULT_DELAY)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Greeter {
            greeted: Subscribers::new(),
            delay,
        }
    }
}

impl Default for Greeter {
    fn default() -> Self {
        Self::new()
    }
}

impl GreeterApi for Greeter {
    fn greet(&self, name: &str) -> String {
        let message = greeting(name);
        self.announce(&message);
        message
    }

    fn announce(&self, message: &str) {
        self.greeted.emit(&message.to_string());
    }

    fn subscribe_greeted(&self, handler: Box<dyn FnMut(&String)>) -> SubscriptionId {
        self.greeted.subscribe(handler)
    }

    fn unsubscribe_greeted(&self, id: SubscriptionId) -> bool {
        self.greeted.unsubscribe(id)
    }

    fn greet_later(&self, dispatch: &DispatchHandle, name: &str) -> Pending<String> {
        let (completer, pending) = completion();
        let message = greeting(name);
        let delay = self.delay;
        let dispatch = dispatch.clone();

        std::thread::spawn(move || {
            std::thread::sleep(delay);
            let announced = message.clone();
            dispatch.post(move |ctx| {
                if let Ok(greeter) = ctx.get::<dyn GreeterApi>(NAME) {
                    greeter.announce(&announced);
                }
            });
            completer.complete(message);
        });

        pending
    }
}

fn single_name(args: &[Value]) -> Result<&str, InvokeError> {
    match args {
        [Value::Str(name), ..] => Ok(name.as_str()),
        _ => Err(InvokeError::Failed("expected a name".to_string())),
    }
}

impl Module for Greeter {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn operations(&self) -> &'static [OperationSpec] {
        OPERATIONS
    }

    fn invoke(
        &self,
        ctx: &InvokeContext<'_>,
        operation: &str,
        args: &[Value],
    ) -> Result<Value, InvokeError> {
        match operation {
            "greet" => Ok(Value::Str(self.greet(single_name(args)?))),
            "greet_with_sum" => {
                let name = single_name(args)?;
                let (a, b) = match args {
                    [_, Value::Int(a), Value::Int(b)] => (*a, *b),
                    _ => return Err(InvokeError::Failed("expected two integers".to_string())),
                };
                let calc = ctx.get::<dyn CalculatorApi>(calculator_interface::NAME)?;
                let sum = calc
                    .add(a, b)
                    .ok_or_else(|| InvokeError::Failed("sum overflowed".to_string()))?;
                Ok(Value::Str(format!(
                    "{} {} + {} = {}",
                    self.greet(name),
                    a,
                    b,
                    sum
                )))
            }
            "greet_later" => {
                // Fire and forget; the greeting arrives through `greeted`.
                let _pending = self.greet_later(ctx.dispatch(), single_name(args)?);
                Ok(Value::Unit)
            }
            other => Err(InvokeError::UnknownOperation(other.to_string())),
        }
    }

    fn provide(self: Rc<Self>, interfaces: &mut Interfaces) {
        interfaces.insert::<dyn GreeterApi>(self);
    }
}

modhost_abi::declare_module!("greeter", Greeter::new, "../module.json");

#[cfg(test)]
mod tests {
    use super::*;
    use modhost_abi::{Dispatcher, LookupError, NoModules, Poll};
    use std::cell::{Cell, RefCell};

    #[test]
    fn test_greet_emits_event() {
        let greeter = Greeter::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = greeter.subscribe_greeted(Box::new(move |m: &String| {
            sink.borrow_mut().push(m.clone());
        }));

        assert_eq!(greeter.greet("Ada"), "Hello, Ada!");
        assert!(greeter.unsubscribe_greeted(id));
        greeter.greet("Grace");

        assert_eq!(*seen.borrow(), vec!["Hello, Ada!".to_string()]);
    }

    #[test]
    fn test_listener_can_unsubscribe_itself() {
        let greeter = Rc::new(Greeter::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let own_id = Rc::new(Cell::new(None));

        let weak = Rc::downgrade(&greeter);
        let sink = Rc::clone(&seen);
        let slot = Rc::clone(&own_id);
        let id = greeter.subscribe_greeted(Box::new(move |m: &String| {
            sink.borrow_mut().push(m.clone());
            if let (Some(greeter), Some(id)) = (weak.upgrade(), slot.get()) {
                greeter.unsubscribe_greeted(id);
            }
        }));
        own_id.set(Some(id));

        assert_eq!(greeter.greet("Ada"), "Hello, Ada!");
        greeter.greet("Grace");

        assert_eq!(*seen.borrow(), vec!["Hello, Ada!".to_string()]);
        assert!(!greeter.unsubscribe_greeted(id));
    }

    #[test]
    fn test_sum_without_calculator_reports_dependency() {
        let dispatcher = Dispatcher::new();
        let ctx = InvokeContext::new(&NoModules, dispatcher.handle());
        let result = Greeter::new().invoke(
            &ctx,
            "greet_with_sum",
            &[Value::from("Ada"), Value::Int(1), Value::Int(2)],
        );
        assert!(matches!(
            result,
            Err(InvokeError::Dependency(LookupError::NotFound(ref n))) if n == "calculator"
        ));
    }

    #[test]
    fn test_greet_later_completes_and_posts() {
        let dispatcher = Dispatcher::new();
        let greeter = Greeter::with_delay(Duration::from_millis(1));

        let pending = greeter.greet_later(&dispatcher.handle(), "Linus");
        assert_eq!(
            pending.wait_timeout(Duration::from_secs(5)),
            Poll::Ready(Ok("Hello, Linus!".to_string()))
        );
        // The completion is sent after the announcement job is queued.
        assert_eq!(dispatcher.pump(&NoModules), 1);
    }

    #[test]
    fn test_event_listed_but_not_invokable() {
        let greeted = Greeter::new()
            .operations()
            .iter()
            .find(|op| op.name == "greeted")
            .copied();
        assert!(greeted.is_some_and(|op| !op.invokable));
    }
}
