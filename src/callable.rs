//! The callable capability shared by native functions, user closures and
//! classes.

use std::fmt;
use std::rc::Rc;

use chrono::Utc;
use log::debug;

use crate::class::LoxClass;
use crate::error::Result;
use crate::function::LoxFunction;
use crate::interpreter::Interpreter;
use crate::value::Value;

/// Anything that can appear on the left of `(...)`.
///
/// The interpreter checks the argument count against [`arity`](Self::arity)
/// before calling, so implementations may assume `arguments.len() == arity`.
pub trait LoxCallable {
    fn arity(&self) -> usize;

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value>;
}

/// Closed set of callable runtime values.
#[derive(Clone)]
pub enum Callable {
    Native(Rc<NativeFunction>),
    Function(Rc<LoxFunction>),
    Class(Rc<LoxClass>),
}

impl Callable {
    /// Identity comparison, used by `==`.
    pub fn same(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Native(a), Callable::Native(b)) => Rc::ptr_eq(a, b),
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Class(a), Callable::Class(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl LoxCallable for Callable {
    fn arity(&self) -> usize {
        match self {
            Callable::Native(native) => native.arity(),
            Callable::Function(function) => function.arity(),
            Callable::Class(class) => class.arity(),
        }
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        match self {
            Callable::Native(native) => native.call(interpreter, arguments),
            Callable::Function(function) => function.call(interpreter, arguments),
            Callable::Class(class) => class.call(interpreter, arguments),
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native(native) => write!(f, "{}", native),
            Callable::Function(function) => write!(f, "{}", function),
            Callable::Class(class) => write!(f, "{}", class),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// A function implemented by the host.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> Value,
}

impl LoxCallable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, _interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        debug!("Calling native function '{}'", self.name);

        Ok((self.func)(&arguments))
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn>")
    }
}

/// Natives installed into every fresh global environment.
pub fn natives() -> Vec<NativeFunction> {
    vec![NativeFunction {
        name: "clock",
        arity: 0,
        func: |_args: &[Value]| {
            let millis: i64 = Utc::now().timestamp_millis();

            Value::Number(millis as f64 / 1000.0)
        },
    }]
}
