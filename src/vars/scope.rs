//! Lexically scoped build variables.
//!
//! Scopes form a tree: a child holds its parent, never the reverse. Only
//! references with source `.` are looked up locally; everything else (and
//! every local miss) goes to the parent. The local read lock is released
//! before delegating, so no two scope locks are ever held at once.

use super::{Reference, StaticVariables, Tracker, Variables, VarsError, LOCAL_SOURCE};
use serde_json::Value;
use std::sync::{Arc, RwLock};

/// One scope of build-local variables.
pub struct BuildVariables {
    parent: Option<Arc<dyn Variables>>,
    local: RwLock<StaticVariables>,
    tracker: Arc<Tracker>,
}

impl BuildVariables {
    /// A root scope with nothing above it.
    pub fn new(tracker: Arc<Tracker>) -> Self {
        Self {
            parent: None,
            local: RwLock::new(StaticVariables::new()),
            tracker,
        }
    }

    /// A root scope delegating misses to `parent`, e.g. a credential store.
    pub fn with_parent(parent: Arc<dyn Variables>, tracker: Arc<Tracker>) -> Self {
        Self {
            parent: Some(parent),
            local: RwLock::new(StaticVariables::new()),
            tracker,
        }
    }

    /// A child scope of `self`.
    pub fn new_scope(self: &Arc<Self>, tracker: Arc<Tracker>) -> Arc<Self> {
        let parent: Arc<dyn Variables> = Arc::clone(self) as Arc<dyn Variables>;
        Arc::new(Self::with_parent(parent, tracker))
    }

    /// Set a local variable. With `redact`, the value is tracked before
    /// this returns.
    pub fn set_var(
        &self,
        source: &str,
        name: &str,
        value: Value,
        redact: bool,
    ) -> Result<(), VarsError> {
        tracing::trace!(source, name, redact, "setting build var");

        let tracked = redact.then(|| value.clone());
        self.local
            .write()
            .map_err(|_| VarsError::Poisoned)?
            .insert(name, value);

        if let Some(value) = tracked {
            let reference = Reference {
                source: source.to_string(),
                path: name.to_string(),
                fields: Vec::new(),
            };
            self.tracker.track(&reference, &value);
        }
        Ok(())
    }

    pub fn redaction_enabled(&self) -> bool {
        self.tracker.enabled()
    }

    pub fn tracker(&self) -> &Arc<Tracker> {
        &self.tracker
    }
}

impl Variables for BuildVariables {
    fn get(&self, reference: &Reference) -> Result<Option<Value>, VarsError> {
        if reference.source == LOCAL_SOURCE {
            let local = self
                .local
                .read()
                .map_err(|_| VarsError::Poisoned)?
                .get(&reference.without_source())?;
            if local.is_some() {
                return Ok(local);
            }
        }

        match &self.parent {
            Some(parent) => parent.get(reference),
            None => Ok(None),
        }
    }

    fn list(&self) -> Result<Vec<Reference>, VarsError> {
        let mut list = match &self.parent {
            Some(parent) => parent.list()?,
            None => Vec::new(),
        };
        let local = self.local.read().map_err(|_| VarsError::Poisoned)?;
        list.extend(local.names().map(Reference::local));
        Ok(list)
    }
}

impl std::fmt::Debug for BuildVariables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildVariables")
            .field("has_parent", &self.parent.is_some())
            .field("redaction_enabled", &self.tracker.enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn root() -> Arc<BuildVariables> {
        Arc::new(BuildVariables::new(Arc::new(Tracker::new(true))))
    }

    #[test]
    fn test_pl009_set_then_get_local() {
        let scope = root();
        scope.set_var(".", "version", json!("1.2.3"), false).unwrap();
        assert_eq!(
            scope.get(&Reference::local("version")).unwrap(),
            Some(json!("1.2.3"))
        );
    }

    #[test]
    fn test_pl009_unscoped_ref_skips_locals() {
        let scope = root();
        scope.set_var(".", "version", json!("1.2.3"), false).unwrap();
        let unscoped = Reference::parse("version").unwrap();
        assert_eq!(scope.get(&unscoped).unwrap(), None);
    }

    #[test]
    fn test_pl009_unset_not_found() {
        let scope = root();
        let child = scope.new_scope(Arc::clone(scope.tracker()));
        assert_eq!(child.get(&Reference::local("nope")).unwrap(), None);
    }

    #[test]
    fn test_pl009_child_delegates_to_parent() {
        let parent = root();
        parent.set_var(".", "branch", json!("main"), false).unwrap();
        let child = parent.new_scope(Arc::clone(parent.tracker()));
        let grandchild = child.new_scope(Arc::clone(parent.tracker()));
        assert_eq!(
            grandchild.get(&Reference::local("branch")).unwrap(),
            Some(json!("main"))
        );
    }

    #[test]
    fn test_pl009_child_shadows_parent() {
        let parent = root();
        parent.set_var(".", "x", json!(1), false).unwrap();
        let child = parent.new_scope(Arc::clone(parent.tracker()));
        child.set_var(".", "x", json!(2), false).unwrap();

        assert_eq!(child.get(&Reference::local("x")).unwrap(), Some(json!(2)));
        assert_eq!(parent.get(&Reference::local("x")).unwrap(), Some(json!(1)));
    }

    #[test]
    fn test_pl009_parent_never_sees_child_locals() {
        let parent = root();
        let child = parent.new_scope(Arc::clone(parent.tracker()));
        child.set_var(".", "only-child", json!(true), false).unwrap();
        assert_eq!(parent.get(&Reference::local("only-child")).unwrap(), None);
    }

    #[test]
    fn test_pl009_root_delegates_to_credentials() {
        let creds: StaticVariables = [("token", json!("abc"))].into_iter().collect();
        let tracker = Arc::new(Tracker::new(false));
        let scope = Arc::new(BuildVariables::with_parent(Arc::new(creds), tracker));
        let child = scope.new_scope(Arc::clone(scope.tracker()));
        assert_eq!(
            child.get(&Reference::parse("token").unwrap()).unwrap(),
            Some(json!("abc"))
        );
        assert!(!child.redaction_enabled());
    }

    #[test]
    fn test_pl009_field_access_on_local() {
        let scope = root();
        scope
            .set_var(".", "meta", json!({"build": {"id": 42}}), false)
            .unwrap();
        assert_eq!(
            scope.get(&Reference::parse(".:meta.build.id").unwrap()).unwrap(),
            Some(json!(42))
        );
        assert!(scope.get(&Reference::parse(".:meta.nope").unwrap()).is_err());
    }

    #[test]
    fn test_pl009_redacted_write_tracked_before_return() {
        let scope = root();
        assert!(scope.redaction_enabled());
        scope.set_var(".", "password", json!("hunter2"), true).unwrap();
        scope.set_var(".", "public", json!("visible"), false).unwrap();
        assert_eq!(scope.tracker().tracked_values(), vec!["hunter2".to_string()]);
        assert_eq!(
            scope.tracker().redact("pw=hunter2 visible"),
            "pw=((redacted)) visible"
        );
    }

    #[test]
    fn test_pl009_list_parent_then_local() {
        let creds: StaticVariables = [("token", json!("abc"))].into_iter().collect();
        let scope = Arc::new(BuildVariables::with_parent(
            Arc::new(creds),
            Arc::new(Tracker::new(false)),
        ));
        scope.set_var(".", "a", json!(1), false).unwrap();
        let child = scope.new_scope(Arc::clone(scope.tracker()));
        child.set_var(".", "b", json!(2), false).unwrap();

        let listed: Vec<String> = child
            .list()
            .unwrap()
            .into_iter()
            .map(|r| r.to_string())
            .collect();
        assert_eq!(listed, vec!["((token))", "((.:a))", "((.:b))"]);
    }

    #[test]
    fn test_pl009_concurrent_siblings() {
        let parent = root();
        parent.set_var(".", "shared", json!("base"), false).unwrap();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let scope = parent.new_scope(Arc::clone(parent.tracker()));
                let parent = Arc::clone(&parent);
                std::thread::spawn(move || {
                    for j in 0..50 {
                        let name = format!("v{i}-{j}");
                        scope.set_var(".", &name, json!(j), false).unwrap();
                        parent.set_var(".", &name, json!(j), true).unwrap();
                        assert_eq!(scope.get(&Reference::local(&name)).unwrap(), Some(json!(j)));
                        assert_eq!(
                            scope.get(&Reference::local("shared")).unwrap(),
                            Some(json!("base"))
                        );
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(parent.list().unwrap().len(), 1 + 8 * 50);
    }
}
