//! Ordered interceptor chains wrapping named host functions.
//!
//! An interceptor receives the call arguments and a `next` continuation. It
//! may call `next` to continue down the chain, alter the arguments or result,
//! or return without calling it to suppress the original behaviour. The most
//! recently installed interceptor runs outermost.

use std::collections::BTreeMap;
use std::fmt;

use crate::runtime::Value;

/// Continuation invoking the rest of the chain.
pub type Next<'a> = &'a dyn Fn(&[Value]) -> Value;

type InterceptorFn = Box<dyn Fn(&[Value], Next<'_>) -> Value>;

/// Identifies one installed interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterceptorId(u64);

struct Installed {
    id: InterceptorId,
    label: String,
    interceptor: InterceptorFn,
}

impl fmt::Debug for Installed {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Installed")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Interceptors wrapping a single function, outermost first.
#[derive(Debug, Default)]
pub struct InterceptorChain {
    installed: Vec<Installed>,
}

impl InterceptorChain {
    /// Runs the chain, ending in `base` when every interceptor continues.
    pub fn invoke(&self, args: &[Value], base: &dyn Fn(&[Value]) -> Value) -> Value {
        self.invoke_from(0, args, base)
    }

    fn invoke_from(&self, index: usize, args: &[Value], base: &dyn Fn(&[Value]) -> Value) -> Value {
        match self.installed.get(index) {
            Some(entry) => {
                let next = |args: &[Value]| self.invoke_from(index + 1, args, base);
                (entry.interceptor)(args, &next)
            }
            None => base(args),
        }
    }

    /// Labels of installed interceptors, outermost first.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.installed
            .iter()
            .map(|entry| entry.label.as_str())
            .collect()
    }

    /// Returns `true` when nothing is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.installed.is_empty()
    }
}

/// Interceptor chains keyed by function name.
#[derive(Debug, Default)]
pub struct InterceptorRegistry {
    chains: BTreeMap<String, InterceptorChain>,
    next_id: u64,
}

impl InterceptorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `interceptor` as the outermost wrapper of `function`.
    pub fn install<F>(
        &mut self,
        function: &str,
        label: impl Into<String>,
        interceptor: F,
    ) -> InterceptorId
    where
        F: Fn(&[Value], Next<'_>) -> Value + 'static,
    {
        let id = InterceptorId(self.next_id);
        self.next_id += 1;
        let chain = self.chains.entry(function.to_owned()).or_default();
        chain.installed.insert(
            0,
            Installed {
                id,
                label: label.into(),
                interceptor: Box::new(interceptor),
            },
        );
        id
    }

    /// Removes the interceptor `id` from `function`.
    ///
    /// Returns `false` when it was not installed.
    pub fn uninstall(&mut self, function: &str, id: InterceptorId) -> bool {
        self.remove_where(function, |entry| entry.id == id)
    }

    /// Removes every interceptor labelled `label` from `function`.
    pub fn uninstall_labelled(&mut self, function: &str, label: &str) -> bool {
        self.remove_where(function, |entry| entry.label == label)
    }

    fn remove_where(&mut self, function: &str, predicate: impl Fn(&Installed) -> bool) -> bool {
        let Some(chain) = self.chains.get_mut(function) else {
            return false;
        };
        let before = chain.installed.len();
        chain.installed.retain(|entry| !predicate(entry));
        let removed = chain.installed.len() != before;
        if chain.is_empty() {
            self.chains.remove(function);
        }
        removed
    }

    /// Calls `function` through its chain, or `base` directly when unwrapped.
    pub fn invoke(
        &self,
        function: &str,
        args: &[Value],
        base: &dyn Fn(&[Value]) -> Value,
    ) -> Value {
        match self.chains.get(function) {
            Some(chain) => chain.invoke(args, base),
            None => base(args),
        }
    }

    /// Labels of interceptors wrapping `function`, outermost first.
    #[must_use]
    pub fn labels(&self, function: &str) -> Vec<&str> {
        self.chains
            .get(function)
            .map(InterceptorChain::labels)
            .unwrap_or_default()
    }

    /// Returns `true` when `function` is wrapped.
    #[must_use]
    pub fn is_intercepted(&self, function: &str) -> bool {
        self.chains.contains_key(function)
    }
}
