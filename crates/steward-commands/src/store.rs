use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};

use rusqlite::Connection;
use tracing::info;

use crate::db;
use crate::error::{CommandError, Result};

/// Placeholder in a stored response that expands to the invoker's mention.
const USER_PLACEHOLDER: &str = "%user%";

pub struct CustomCommands {
    db: Arc<Mutex<Connection>>,
    /// Built-in command names. Set exactly once at startup, read-only
    /// thereafter.
    reserved: OnceLock<HashSet<String>>,
}

impl CustomCommands {
    pub fn new(db: Arc<Mutex<Connection>>) -> Result<Self> {
        {
            let conn = db.lock().unwrap();
            db::init_db(&conn)?;
        }
        Ok(Self {
            db,
            reserved: OnceLock::new(),
        })
    }

    /// Freeze the exclusion list. Later calls are ignored.
    pub fn set_reserved<I: IntoIterator<Item = String>>(&self, names: I) {
        let _ = self.reserved.set(names.into_iter().collect());
    }

    fn is_reserved(&self, name: &str) -> bool {
        self.reserved.get().is_some_and(|set| set.contains(name))
    }

    pub fn has(&self, name: &str) -> Result<bool> {
        let conn = self.db.lock().unwrap();
        Ok(db::get(&conn, name)?.is_some())
    }

    /// Define (or redefine) a custom command. Reserved names are rejected,
    /// never overwritten.
    pub fn define(&self, name: &str, response: &str) -> Result<()> {
        if self.is_reserved(name) {
            return Err(CommandError::ReservedName {
                name: name.to_string(),
            });
        }
        let conn = self.db.lock().unwrap();
        db::put(&conn, name, response)?;
        info!(name, "custom command defined");
        Ok(())
    }

    /// Replace the response of an existing command.
    pub fn edit(&self, name: &str, response: &str) -> Result<()> {
        if self.is_reserved(name) {
            return Err(CommandError::ReservedName {
                name: name.to_string(),
            });
        }
        let conn = self.db.lock().unwrap();
        if db::get(&conn, name)?.is_none() {
            return Err(CommandError::NotFound {
                name: name.to_string(),
            });
        }
        db::put(&conn, name, response)?;
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let conn = self.db.lock().unwrap();
        if !db::delete(&conn, name)? {
            return Err(CommandError::NotFound {
                name: name.to_string(),
            });
        }
        info!(name, "custom command removed");
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<String>> {
        let conn = self.db.lock().unwrap();
        db::names(&conn)
    }

    /// Render a command's response for the invoking member.
    pub fn render(&self, name: &str, invoker_mention: &str) -> Result<String> {
        let conn = self.db.lock().unwrap();
        let response = db::get(&conn, name)?.ok_or_else(|| CommandError::NotFound {
            name: name.to_string(),
        })?;
        Ok(response.replace(USER_PLACEHOLDER, invoker_mention))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CustomCommands {
        let conn = Connection::open_in_memory().unwrap();
        let store = CustomCommands::new(Arc::new(Mutex::new(conn))).unwrap();
        store.set_reserved(["help".to_string(), "lvl".to_string()]);
        store
    }

    #[test]
    fn define_render_round_trip() {
        let store = store();
        store.define("hug", "%user% gets a hug!").unwrap();
        assert!(store.has("hug").unwrap());
        assert_eq!(
            store.render("hug", "<@42>").unwrap(),
            "<@42> gets a hug!"
        );
    }

    #[test]
    fn reserved_name_is_rejected_and_store_unchanged() {
        let store = store();
        let err = store.define("lvl", "shadowed").unwrap_err();
        assert!(matches!(err, CommandError::ReservedName { .. }));
        assert!(!store.has("lvl").unwrap());
    }

    #[test]
    fn reserved_set_freezes_on_first_call() {
        let store = store();
        // A second freeze attempt must not widen or replace the set.
        store.set_reserved(["hug".to_string()]);
        store.define("hug", "fine").unwrap();
        assert!(store.define("help", "nope").is_err());
    }

    #[test]
    fn edit_requires_existing_command() {
        let store = store();
        assert!(matches!(
            store.edit("ghost", "boo").unwrap_err(),
            CommandError::NotFound { .. }
        ));

        store.define("greet", "hi").unwrap();
        store.edit("greet", "hello").unwrap();
        assert_eq!(store.render("greet", "<@1>").unwrap(), "hello");
    }

    #[test]
    fn remove_requires_existing_command() {
        let store = store();
        store.define("greet", "hi").unwrap();
        store.remove("greet").unwrap();
        assert!(!store.has("greet").unwrap());
        assert!(matches!(
            store.remove("greet").unwrap_err(),
            CommandError::NotFound { .. }
        ));
    }

    #[test]
    fn list_is_sorted() {
        let store = store();
        store.define("zeta", "z").unwrap();
        store.define("alpha", "a").unwrap();
        assert_eq!(store.list().unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn names_are_case_sensitive() {
        let store = store();
        store.define("Hug", "big hug").unwrap();
        assert!(!store.has("hug").unwrap());
        assert!(store.has("Hug").unwrap());
    }
}
