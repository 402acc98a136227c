//! Calculator demo module
//!
//! Other modules reach it through [`CalculatorApi`], published separately in
//! the `calculator-interface` crate.

use std::rc::Rc;

use calculator_interface::{CalculatorApi, NAME};
use modhost_abi::{
    Interfaces, InvokeContext, InvokeError, Module, OperationSpec, ParamSpec, Value, ValueKind,
};

pub const VERSION: &str = "1.0.0";

const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::new(
        "add",
        ValueKind::Int,
        &[
            ParamSpec::new("a", ValueKind::Int),
            ParamSpec::new("b", ValueKind::Int),
        ],
    ),
    OperationSpec::new(
        "subtract",
        ValueKind::Int,
        &[
            ParamSpec::new("a", ValueKind::Int),
            ParamSpec::new("b", ValueKind::Int),
        ],
    ),
    OperationSpec::new(
        "echo",
        ValueKind::Str,
        &[ParamSpec::new("message", ValueKind::Str)],
    ),
];

#[derive(Debug, Default)]
pub struct Calculator;

impl Calculator {
    pub fn new() -> Self {
        Calculator
    }
}

impl CalculatorApi for Calculator {
    fn add(&self, a: i64, b: i64) -> Option<i64> {
        a.checked_add(b)
    }

    fn subtract(&self, a: i64, b: i64) -> Option<i64> {
        a.checked_sub(b)
    }

    fn echo(&self, message: &str) -> String {
        message.to_string()
    }
}

fn int_pair(args: &[Value]) -> Result<(i64, i64), InvokeError> {
    match args {
        [Value::Int(a), Value::Int(b)] => Ok((*a, *b)),
        _ => Err(InvokeError::Failed("expected two integers".to_string())),
    }
}

fn overflow(operation: &str) -> InvokeError {
    InvokeError::Failed(format!("{} overflowed", operation))
}

impl Module for Calculator {
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
        _ctx: &InvokeContext<'_>,
        operation: &str,
        args: &[Value],
    ) -> Result<Value, InvokeError> {
        match operation {
            "add" => {
                let (a, b) = int_pair(args)?;
                self.add(a, b).map(Value::Int).ok_or_else(|| overflow("add"))
            }
            "subtract" => {
                let (a, b) = int_pair(args)?;
                self.subtract(a, b)
                    .map(Value::Int)
                    .ok_or_else(|| overflow("subtract"))
            }
            "echo" => match args {
                [Value::Str(message)] => Ok(Value::Str(self.echo(message))),
                _ => Err(InvokeError::Failed("expected a message".to_string())),
            },
            other => Err(InvokeError::UnknownOperation(other.to_string())),
        }
    }

    fn provide(self: Rc<Self>, interfaces: &mut Interfaces) {
        interfaces.insert::<dyn CalculatorApi>(self);
    }
}

modhost_abi::declare_module!("calculator", Calculator::new, "../module.json");
