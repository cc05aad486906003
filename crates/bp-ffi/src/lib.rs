//! C FFI bindings for bp-core
//!
//! This crate provides a C-compatible API for a native GUI shell.
//! Structured results are returned as JSON strings that the caller frees
//! with `bp_free_string`.

use bp_core::{CategoryKey, EngineConfig, Error, RuleSet, RuleWarning, Session};
use serde::Serialize;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;

/// Opaque handle to an editing session
pub struct FfiSession {
    inner: Session,
}

/// Borrow a C string argument as UTF-8
unsafe fn str_arg<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok()
}

fn into_c_string(s: String) -> *mut c_char {
    CString::new(s).map(|s| s.into_raw()).unwrap_or(ptr::null_mut())
}

fn to_json<T: Serialize>(value: &T) -> *mut c_char {
    serde_json::to_string(value)
        .map(into_c_string)
        .unwrap_or(ptr::null_mut())
}

/// 1 for a change, 0 for a no-op, -1 for an error
fn status(result: bp_core::Result<bool>) -> c_int {
    match result {
        Ok(true) => 1,
        Ok(false) | Err(Error::NoOp(_)) => 0,
        Err(_) => -1,
    }
}

fn names_from_json(json: &str) -> Option<Vec<String>> {
    serde_json::from_str(json).ok()
}

/// Open a block.properties file
///
/// # Safety
/// - `path` must be a valid C string
/// - Returns null on error
#[no_mangle]
pub unsafe extern "C" fn bp_session_open(path: *const c_char) -> *mut FfiSession {
    let Some(path) = str_arg(path) else {
        return ptr::null_mut();
    };
    match Session::open(path) {
        Ok(inner) => Box::into_raw(Box::new(FfiSession { inner })),
        Err(_) => ptr::null_mut(),
    }
}

/// Start a session from document text
///
/// # Safety
/// - `text` must be a valid C string
/// - Returns null if the text does not parse
#[no_mangle]
pub unsafe extern "C" fn bp_session_from_text(text: *const c_char) -> *mut FfiSession {
    let Some(text) = str_arg(text) else {
        return ptr::null_mut();
    };
    match Session::from_text(text) {
        Ok(inner) => Box::into_raw(Box::new(FfiSession { inner })),
        Err(_) => ptr::null_mut(),
    }
}

/// Free a session
///
/// # Safety
/// - `session` must be a valid pointer returned by `bp_session_open` or
///   `bp_session_from_text`, or null
#[no_mangle]
pub unsafe extern "C" fn bp_session_free(session: *mut FfiSession) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Serialize the current document
///
/// # Safety
/// - `session` must be a valid session pointer
/// - Caller must free the returned string with `bp_free_string`
#[no_mangle]
pub unsafe extern "C" fn bp_session_text(session: *const FfiSession) -> *mut c_char {
    if session.is_null() {
        return ptr::null_mut();
    }
    into_c_string((*session).inner.to_text())
}

/// Get the number of categories in the current document
///
/// # Safety
/// - `session` must be a valid session pointer
#[no_mangle]
pub unsafe extern "C" fn bp_session_category_count(session: *const FfiSession) -> usize {
    if session.is_null() {
        return 0;
    }
    (*session).inner.document().category_count()
}

/// 1-based line of a category in the serialized text, 0 if unknown
///
/// # Safety
/// - `session` must be a valid session pointer
/// - `category` must be a valid C string
#[no_mangle]
pub unsafe extern "C" fn bp_session_category_line(session: *const FfiSession, category: *const c_char) -> usize {
    if session.is_null() {
        return 0;
    }
    str_arg(category)
        .and_then(|c| CategoryKey::parse(c).ok())
        .and_then(|key| (*session).inner.document().category_line(&key))
        .unwrap_or(0)
}

/// Insert an identifier into a category
///
/// # Safety
/// - `session` must be a valid session pointer
/// - `category` and `identifier` must be valid C strings
/// - Returns 1 if inserted, 0 if already present, -1 on error
#[no_mangle]
pub unsafe extern "C" fn bp_session_insert(
    session: *mut FfiSession,
    category: *const c_char,
    identifier: *const c_char,
) -> c_int {
    let (Some(category), Some(identifier)) = (str_arg(category), str_arg(identifier)) else {
        return -1;
    };
    if session.is_null() {
        return -1;
    }
    let result = CategoryKey::parse(category)
        .map_err(Error::from)
        .and_then(|key| (*session).inner.insert(&key, identifier));
    status(result)
}

/// Remove an identifier from a category
///
/// # Safety
/// - `session` must be a valid session pointer
/// - `category` and `identifier` must be valid C strings
/// - Returns 1 if removed, 0 if it was absent, -1 on error
#[no_mangle]
pub unsafe extern "C" fn bp_session_remove(
    session: *mut FfiSession,
    category: *const c_char,
    identifier: *const c_char,
) -> c_int {
    let (Some(category), Some(identifier)) = (str_arg(category), str_arg(identifier)) else {
        return -1;
    };
    if session.is_null() {
        return -1;
    }
    let result = CategoryKey::parse(category)
        .map_err(Error::from)
        .and_then(|key| (*session).inner.remove(&key, identifier))
        .map(|()| true);
    status(result)
}

/// Expand a template over new names
///
/// # Safety
/// - `session` must be a valid session pointer
/// - `template` must be a valid C string
/// - `names_json` must be a valid C string holding a JSON array of strings
/// - Returns a JSON report, or null on error
/// - Caller must free the returned string with `bp_free_string`
#[no_mangle]
pub unsafe extern "C" fn bp_session_expand(
    session: *mut FfiSession,
    template: *const c_char,
    names_json: *const c_char,
) -> *mut c_char {
    let (Some(template), Some(names)) = (str_arg(template), str_arg(names_json).and_then(names_from_json)) else {
        return ptr::null_mut();
    };
    if session.is_null() {
        return ptr::null_mut();
    }
    match (*session).inner.expand_template(template, &names) {
        Ok(report) => to_json(&report),
        Err(_) => ptr::null_mut(),
    }
}

/// A plan or report plus the rule lines that were skipped
#[derive(Serialize)]
struct RulesOutcome<'a, T: Serialize> {
    #[serde(flatten)]
    outcome: T,
    warnings: &'a [RuleWarning],
}

/// Auto-map names with rule text
///
/// # Safety
/// - `session` must be a valid session pointer
/// - `rules_text` must be a valid C string in rule file format
/// - `names_json` must be a valid C string holding a JSON array of strings
/// - `dry_run` non-zero plans without changing the document
/// - Returns a JSON plan or report with a `warnings` array, or null on error
/// - Caller must free the returned string with `bp_free_string`
#[no_mangle]
pub unsafe extern "C" fn bp_session_apply_rules(
    session: *mut FfiSession,
    rules_text: *const c_char,
    names_json: *const c_char,
    dry_run: c_int,
) -> *mut c_char {
    let (Some(rules_text), Some(names)) = (str_arg(rules_text), str_arg(names_json).and_then(names_from_json)) else {
        return ptr::null_mut();
    };
    if session.is_null() {
        return ptr::null_mut();
    }
    let rules = RuleSet::parse(rules_text);
    let session = &mut (*session).inner;

    if dry_run != 0 {
        return to_json(&RulesOutcome {
            outcome: session.plan_rules(&rules.rules, &names),
            warnings: &rules.warnings,
        });
    }
    match session.apply_rules(&rules.rules, &names) {
        Ok(report) => to_json(&RulesOutcome {
            outcome: report,
            warnings: &rules.warnings,
        }),
        Err(_) => ptr::null_mut(),
    }
}

/// Rank categories for a name
///
/// # Safety
/// - `session` must be a valid session pointer
/// - `name` must be a valid C string
/// - Returns a JSON array of `{category, confidence}`, or null on error
/// - Caller must free the returned string with `bp_free_string`
#[no_mangle]
pub unsafe extern "C" fn bp_session_suggest(session: *const FfiSession, name: *const c_char, limit: usize) -> *mut c_char {
    let Some(name) = str_arg(name) else {
        return ptr::null_mut();
    };
    if session.is_null() {
        return ptr::null_mut();
    }
    let config = EngineConfig {
        suggestion_limit: limit,
        ..EngineConfig::default()
    };
    to_json(&(*session).inner.suggest(name, &config))
}

/// Undo the last operation
///
/// # Safety
/// - `session` must be a valid session pointer
/// - Returns 1 on success, 0 if there is nothing to undo, -1 on error
#[no_mangle]
pub unsafe extern "C" fn bp_session_undo(session: *mut FfiSession) -> c_int {
    if session.is_null() {
        return -1;
    }
    status((*session).inner.undo().map(|_| true))
}

/// Redo the next operation
///
/// # Safety
/// - `session` must be a valid session pointer
/// - Returns 1 on success, 0 if there is nothing to redo, -1 on error
#[no_mangle]
pub unsafe extern "C" fn bp_session_redo(session: *mut FfiSession) -> c_int {
    if session.is_null() {
        return -1;
    }
    status((*session).inner.redo().map(|_| true))
}

/// Jump to the state after operation `checkpoint` (0 = as loaded)
///
/// # Safety
/// - `session` must be a valid session pointer
/// - Returns 1 on success, -1 if the checkpoint is out of range
#[no_mangle]
pub unsafe extern "C" fn bp_session_restore(session: *mut FfiSession, checkpoint: usize) -> c_int {
    if session.is_null() {
        return -1;
    }
    status((*session).inner.restore(checkpoint).map(|_| true))
}

/// Describe the history log
///
/// # Safety
/// - `session` must be a valid session pointer
/// - Returns a JSON array of operations with `current` flags
/// - Caller must free the returned string with `bp_free_string`
#[no_mangle]
pub unsafe extern "C" fn bp_session_history(session: *const FfiSession) -> *mut c_char {
    #[derive(Serialize)]
    struct Entry<'a> {
        description: &'a str,
        timestamp: String,
        added: usize,
        removed: usize,
        applied: bool,
    }

    if session.is_null() {
        return ptr::null_mut();
    }
    let history = (*session).inner.history();
    let entries: Vec<Entry<'_>> = history
        .operations()
        .iter()
        .enumerate()
        .map(|(i, op)| Entry {
            description: &op.description,
            timestamp: op.timestamp.to_rfc3339(),
            added: op.added(),
            removed: op.removed(),
            applied: i < history.cursor(),
        })
        .collect();
    to_json(&entries)
}

/// Identifier changes since load
///
/// # Safety
/// - `session` must be a valid session pointer
/// - Returns a JSON array of `{category, identifier, added}`
/// - Caller must free the returned string with `bp_free_string`
#[no_mangle]
pub unsafe extern "C" fn bp_session_diff(session: *const FfiSession) -> *mut c_char {
    if session.is_null() {
        return ptr::null_mut();
    }
    to_json(&(*session).inner.diff())
}

/// Write the current document to `path`
///
/// # Safety
/// - `session` must be a valid session pointer
/// - `path` must be a valid C string
/// - Returns 1 on success, -1 on error
#[no_mangle]
pub unsafe extern "C" fn bp_session_save_as(session: *const FfiSession, path: *const c_char) -> c_int {
    let Some(path) = str_arg(path) else {
        return -1;
    };
    if session.is_null() {
        return -1;
    }
    status((*session).inner.save_as(path).map(|()| true))
}

/// Free a string returned by other FFI functions
///
/// # Safety
/// - `s` must be a valid pointer returned by a bp_* function or null
#[no_mangle]
pub unsafe extern "C" fn bp_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    unsafe fn take(s: *mut c_char) -> String {
        assert!(!s.is_null());
        let out = CStr::from_ptr(s).to_str().unwrap().to_string();
        bp_free_string(s);
        out
    }

    #[test]
    fn test_session_round_trip() {
        unsafe {
            let text = c("block.10=minecraft:stone_wall minecraft:stone_wall:north\n");
            let session = bp_session_from_text(text.as_ptr());
            assert!(!session.is_null());
            assert_eq!(bp_session_category_count(session), 1);

            assert_eq!(bp_session_insert(session, c("block.10").as_ptr(), c("granite").as_ptr()), 1);
            assert_eq!(bp_session_insert(session, c("block.10").as_ptr(), c("granite").as_ptr()), 0);
            assert_eq!(bp_session_insert(session, c("block").as_ptr(), c("granite").as_ptr()), -1);
            assert_eq!(bp_session_remove(session, c("block.10").as_ptr(), c("missing").as_ptr()), 0);

            assert_eq!(bp_session_undo(session), 1);
            assert_eq!(bp_session_undo(session), 0);
            assert_eq!(
                take(bp_session_text(session)),
                "block.10=minecraft:stone_wall minecraft:stone_wall:north\n"
            );
            assert_eq!(bp_session_restore(session, 9), -1);

            bp_session_free(session);
        }
    }

    #[test]
    fn test_apply_rules_json() {
        unsafe {
            let session = bp_session_from_text(c("block.1=minecraft:stone\n").as_ptr());
            let rules = c("*_ore -> category:block.42\nregex:(oops -> category:block.1\n");
            let names = c(r#"["copper_ore", "iron_ingot"]"#);

            let plan = take(bp_session_apply_rules(session, rules.as_ptr(), names.as_ptr(), 1));
            let value: serde_json::Value = serde_json::from_str(&plan).unwrap();
            assert_eq!(value["unmapped"][0]["candidate"], "iron_ingot");
            assert_eq!(value["warnings"][0]["line"], 2);
            assert_eq!(bp_session_category_count(session), 1);

            let report = take(bp_session_apply_rules(session, rules.as_ptr(), names.as_ptr(), 0));
            let value: serde_json::Value = serde_json::from_str(&report).unwrap();
            assert_eq!(value["inserted"], 1);
            assert_eq!(value["warnings"][0]["text"], "regex:(oops -> category:block.1");
            assert_eq!(bp_session_category_line(session, c("block.42").as_ptr()), 2);

            let diff = take(bp_session_diff(session));
            assert!(diff.contains("copper_ore"));

            let suggestions = take(bp_session_suggest(session, c("tin_ore").as_ptr(), 5));
            assert!(suggestions.contains("block.42"));

            bp_session_free(session);
        }
    }

    #[test]
    fn test_null_arguments() {
        unsafe {
            assert!(bp_session_from_text(ptr::null()).is_null());
            assert!(bp_session_text(ptr::null()).is_null());
            assert_eq!(bp_session_undo(ptr::null_mut()), -1);
            bp_session_free(ptr::null_mut());
        }
    }
}
