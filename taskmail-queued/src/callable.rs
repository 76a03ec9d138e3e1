//! Callables: the bodies of queued commands
//!
//! A callable is what the owner task actually runs when it drains its
//! mailbox. There is one trait per shape, each with a single `invoke` entry
//! point matching the shape's arity. Closures with the matching signature
//! implement the traits directly, and the `*_method` helpers bind a plain
//! function over task-owned state.
//!
//! Callables are shared behind `Arc` so that one operation can be exposed
//! through several queued front ends, each bound to its own mailbox.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use taskmail_core::ExecutionResult;

/// The five callable shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallableShape {
    /// No argument, no result
    Void,
    /// One argument, no result
    Write,
    /// No argument, produces a result without changing owner state
    Read,
    /// No argument, produces a result
    VoidReturn,
    /// One argument, produces a result
    WriteReturn,
}

impl CallableShape {
    pub fn has_argument(self) -> bool {
        matches!(self, Self::Write | Self::WriteReturn)
    }

    pub fn has_result(self) -> bool {
        matches!(self, Self::Read | Self::VoidReturn | Self::WriteReturn)
    }
}

impl fmt::Display for CallableShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Void => "void",
            Self::Write => "write",
            Self::Read => "read",
            Self::VoidReturn => "void-return",
            Self::WriteReturn => "write-return",
        };
        f.write_str(name)
    }
}

/// Callable taking no argument and producing no result
pub trait CallableVoid: Send + Sync {
    fn invoke(&self) -> ExecutionResult;
}

/// Callable consuming one argument
pub trait CallableWrite<A>: Send + Sync {
    fn invoke(&self, argument: &A) -> ExecutionResult;
}

/// Callable producing a result from owner state
pub trait CallableRead<R>: Send + Sync {
    fn invoke(&self, result: &mut R) -> ExecutionResult;
}

/// Callable with side effects that also produces a result
pub trait CallableVoidReturn<R>: Send + Sync {
    fn invoke(&self, result: &mut R) -> ExecutionResult;
}

/// Callable consuming one argument and producing a result
pub trait CallableWriteReturn<A, R>: Send + Sync {
    fn invoke(&self, argument: &A, result: &mut R) -> ExecutionResult;
}

impl<F> CallableVoid for F
where
    F: Fn() -> ExecutionResult + Send + Sync,
{
    fn invoke(&self) -> ExecutionResult {
        self()
    }
}

impl<A, F> CallableWrite<A> for F
where
    F: Fn(&A) -> ExecutionResult + Send + Sync,
{
    fn invoke(&self, argument: &A) -> ExecutionResult {
        self(argument)
    }
}

impl<R, F> CallableRead<R> for F
where
    F: Fn(&mut R) -> ExecutionResult + Send + Sync,
{
    fn invoke(&self, result: &mut R) -> ExecutionResult {
        self(result)
    }
}

impl<R, F> CallableVoidReturn<R> for F
where
    F: Fn(&mut R) -> ExecutionResult + Send + Sync,
{
    fn invoke(&self, result: &mut R) -> ExecutionResult {
        self(result)
    }
}

impl<A, R, F> CallableWriteReturn<A, R> for F
where
    F: Fn(&A, &mut R) -> ExecutionResult + Send + Sync,
{
    fn invoke(&self, argument: &A, result: &mut R) -> ExecutionResult {
        self(argument, result)
    }
}

/// Wrap a closure as a void callable
pub fn void<F>(f: F) -> Arc<dyn CallableVoid>
where
    F: Fn() -> ExecutionResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a write callable
pub fn write<A, F>(f: F) -> Arc<dyn CallableWrite<A>>
where
    A: 'static,
    F: Fn(&A) -> ExecutionResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a read callable
pub fn read<R, F>(f: F) -> Arc<dyn CallableRead<R>>
where
    R: 'static,
    F: Fn(&mut R) -> ExecutionResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a void-return callable
pub fn void_return<R, F>(f: F) -> Arc<dyn CallableVoidReturn<R>>
where
    R: 'static,
    F: Fn(&mut R) -> ExecutionResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a write-return callable
pub fn write_return<A, R, F>(f: F) -> Arc<dyn CallableWriteReturn<A, R>>
where
    A: 'static,
    R: 'static,
    F: Fn(&A, &mut R) -> ExecutionResult + Send + Sync + 'static,
{
    Arc::new(f)
}

// Method binding. The state lock is only ever taken on the owner thread,
// while the mailbox is drained, so it is uncontended.

/// Bind `method` over task state as a void callable
pub fn void_method<T>(state: Arc<Mutex<T>>, method: fn(&mut T)) -> Arc<dyn CallableVoid>
where
    T: Send + 'static,
{
    void(move || {
        method(&mut state.lock());
        ExecutionResult::Succeeded
    })
}

/// Bind `method` over task state as a write callable
pub fn write_method<T, A>(state: Arc<Mutex<T>>, method: fn(&mut T, &A)) -> Arc<dyn CallableWrite<A>>
where
    T: Send + 'static,
    A: 'static,
{
    write(move |argument: &A| {
        method(&mut state.lock(), argument);
        ExecutionResult::Succeeded
    })
}

/// Bind `method` over task state as a read callable
pub fn read_method<T, R>(state: Arc<Mutex<T>>, method: fn(&T, &mut R)) -> Arc<dyn CallableRead<R>>
where
    T: Send + 'static,
    R: 'static,
{
    read(move |result: &mut R| {
        method(&state.lock(), result);
        ExecutionResult::Succeeded
    })
}

/// Bind `method` over task state as a void-return callable
pub fn void_return_method<T, R>(
    state: Arc<Mutex<T>>,
    method: fn(&mut T, &mut R),
) -> Arc<dyn CallableVoidReturn<R>>
where
    T: Send + 'static,
    R: 'static,
{
    void_return(move |result: &mut R| {
        method(&mut state.lock(), result);
        ExecutionResult::Succeeded
    })
}

/// Bind `method` over task state as a write-return callable
pub fn write_return_method<T, A, R>(
    state: Arc<Mutex<T>>,
    method: fn(&mut T, &A, &mut R),
) -> Arc<dyn CallableWriteReturn<A, R>>
where
    T: Send + 'static,
    A: 'static,
    R: 'static,
{
    write_return(move |argument: &A, result: &mut R| {
        method(&mut state.lock(), argument, result);
        ExecutionResult::Succeeded
    })
}

/// Uniform view of every shape used by the queued core: `()` stands in
/// for a missing argument or result.
pub(crate) trait Invoke<A, R>: Send + Sync {
    fn invoke(&self, argument: &A, result: &mut R) -> ExecutionResult;
}

/// Adapter giving a shaped callable the uniform `Invoke` signature
pub(crate) struct Shaped<C: ?Sized>(pub(crate) Arc<C>);

impl Invoke<(), ()> for Shaped<dyn CallableVoid> {
    fn invoke(&self, _argument: &(), _result: &mut ()) -> ExecutionResult {
        self.0.invoke()
    }
}

impl<A> Invoke<A, ()> for Shaped<dyn CallableWrite<A>> {
    fn invoke(&self, argument: &A, _result: &mut ()) -> ExecutionResult {
        self.0.invoke(argument)
    }
}

impl<R> Invoke<(), R> for Shaped<dyn CallableRead<R>> {
    fn invoke(&self, _argument: &(), result: &mut R) -> ExecutionResult {
        self.0.invoke(result)
    }
}

impl<R> Invoke<(), R> for Shaped<dyn CallableVoidReturn<R>> {
    fn invoke(&self, _argument: &(), result: &mut R) -> ExecutionResult {
        self.0.invoke(result)
    }
}

impl<A, R> Invoke<A, R> for Shaped<dyn CallableWriteReturn<A, R>> {
    fn invoke(&self, argument: &A, result: &mut R) -> ExecutionResult {
        self.0.invoke(argument, result)
    }
}
