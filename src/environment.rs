use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// One scope of name→value bindings, optionally chained to an enclosing
/// scope. Lookup misses here do not produce errors; the interpreter owns the
/// error text because it holds the token positions.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Dynamic lookup, walking inner to outer.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.get(name) {
            Some(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            None
        }
    }

    /// Dynamic assignment, walking inner to outer. Returns false when the
    /// name is bound nowhere on the chain.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            true
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            false
        }
    }

    /// The environment exactly `distance` hops up the chain, or `None` if
    /// the chain is shorter — which would mean a resolver/evaluator scope
    /// mismatch.
    pub fn ancestor(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
    ) -> Option<Rc<RefCell<Environment>>> {
        let mut current: Rc<RefCell<Environment>> = env.clone();

        for _ in 0..distance {
            let parent = current.borrow().enclosing.clone();
            match parent {
                Some(parent) => current = parent,
                None => return None,
            }
        }

        Some(current)
    }

    /// Read `name` in the scope `distance` hops up, without falling back to
    /// the dynamic chain walk.
    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Option<Value> {
        Self::ancestor(env, distance)?.borrow().values.get(name).cloned()
    }

    /// Write `name` in the scope `distance` hops up. Returns false when the
    /// hop target does not exist or does not bind the name.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
    ) -> bool {
        match Self::ancestor(env, distance) {
            Some(target) => {
                let mut target = target.borrow_mut();
                if target.values.contains_key(name) {
                    target.values.insert(name.to_string(), value);
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(env: Environment) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(env))
    }

    #[test]
    fn define_then_get() {
        let env = wrap(Environment::new());
        env.borrow_mut().define("x", Value::Number(1.0));

        assert_eq!(env.borrow().get("x"), Some(Value::Number(1.0)));
        assert_eq!(env.borrow().get("y"), None);
    }

    #[test]
    fn get_walks_to_enclosing_scope() {
        let outer = wrap(Environment::new());
        outer.borrow_mut().define("x", Value::Number(1.0));

        let inner = wrap(Environment::with_enclosing(outer));

        assert_eq!(inner.borrow().get("x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn assign_updates_the_defining_scope() {
        let outer = wrap(Environment::new());
        outer.borrow_mut().define("x", Value::Number(1.0));

        let inner = wrap(Environment::with_enclosing(outer.clone()));

        assert!(inner.borrow_mut().assign("x", Value::Number(2.0)));
        assert_eq!(outer.borrow().get("x"), Some(Value::Number(2.0)));

        assert!(!inner.borrow_mut().assign("missing", Value::Nil));
    }

    #[test]
    fn get_at_reads_exactly_the_requested_hop() {
        let global = wrap(Environment::new());
        global.borrow_mut().define("x", Value::String("global".to_string()));

        let middle = wrap(Environment::with_enclosing(global));
        middle.borrow_mut().define("x", Value::String("middle".to_string()));

        let inner = wrap(Environment::with_enclosing(middle));

        assert_eq!(
            Environment::get_at(&inner, 1, "x"),
            Some(Value::String("middle".to_string()))
        );
        assert_eq!(
            Environment::get_at(&inner, 2, "x"),
            Some(Value::String("global".to_string()))
        );
        // No fallback: the innermost scope does not bind x at hop 0.
        assert_eq!(Environment::get_at(&inner, 0, "x"), None);
        // Hop past the end of the chain.
        assert_eq!(Environment::get_at(&inner, 3, "x"), None);
    }

    #[test]
    fn assign_at_writes_exactly_the_requested_hop() {
        let global = wrap(Environment::new());
        global.borrow_mut().define("x", Value::Number(1.0));

        let inner = wrap(Environment::with_enclosing(global.clone()));

        assert!(Environment::assign_at(
            &inner,
            1,
            "x",
            Value::Number(5.0)
        ));
        assert_eq!(global.borrow().get("x"), Some(Value::Number(5.0)));

        assert!(!Environment::assign_at(&inner, 0, "x", Value::Nil));
    }
}
