//! Integration tests against the in-memory registry.

use std::cell::Cell;

use winregal::{
    Child, Entry, ExportOptions, Hive, KeyInfo, Lookup, MemoryHandle, MemoryRegistry, RegKey,
    RegMap, RegValue, RegistryBackend, RegistryError, Result, ValueData, ValueType,
};

/// `HKCU\SOFTWARE\Demo` with value `a`="x" and an empty subkey `Child`.
fn demo_registry() -> MemoryRegistry {
    let registry = MemoryRegistry::new();
    registry.set_value(Hive::CurrentUser, "SOFTWARE\\Demo", RegValue::new("a", "x"));
    registry.create_key(Hive::CurrentUser, "SOFTWARE\\Demo\\Child");
    registry
}

/// A small tree resembling an Explorer MRU key.
fn explorer_registry() -> MemoryRegistry {
    let registry = MemoryRegistry::new();
    let base = "Software\\Microsoft\\Windows\\CurrentVersion\\Explorer";
    registry.set_value(Hive::CurrentUser, &format!("{}\\RunMRU", base), RegValue::new("a", "cmd\\1"));
    registry.set_value(Hive::CurrentUser, &format!("{}\\RunMRU", base), RegValue::new("b", "regedit\\1"));
    registry.set_value(Hive::CurrentUser, &format!("{}\\RunMRU", base), RegValue::new("MRUList", "ba"));
    registry.set_value(
        Hive::CurrentUser,
        &format!("{}\\Advanced", base),
        RegValue::new("Hidden", 1u32),
    );
    registry.set_value(
        Hive::CurrentUser,
        &format!("{}\\Advanced", base),
        RegValue::new("Start_TrackDocs", ValueData::Binary(vec![0xde, 0xad])),
    );
    registry.set_value(
        Hive::CurrentUser,
        &format!("{}\\Advanced\\Folder", base),
        RegValue::new("Paths", vec!["C:\\".to_string(), "D:\\".to_string()]),
    );
    registry
}

#[test]
fn test_end_to_end_materialize() {
    let registry = demo_registry();
    let open = winregal::open(&registry, "HKEY_CURRENT_USER\\SOFTWARE\\Demo").expect("open demo key");
    let map = open.to_map(&ExportOptions::default()).expect("export");

    let mut expected = RegMap::new();
    expected.insert("a".to_string(), Entry::Data(ValueData::String("x".to_string())));
    expected.insert("Child".to_string(), Entry::Key(RegMap::new()));
    assert_eq!(map, expected);
}

#[cfg(feature = "serde")]
#[test]
fn test_end_to_end_json() {
    let registry = demo_registry();
    let open = winregal::open(&registry, "HKEY_CURRENT_USER\\SOFTWARE\\Demo").expect("open demo key");
    let json = open.to_json(&ExportOptions::default()).expect("export");

    let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
    assert_eq!(parsed, serde_json::json!({"a": "x", "Child": {}}));
}

#[test]
fn test_scope_leaves_no_handles() {
    let registry = explorer_registry();
    let key = RegKey::parse("HKEY_CURRENT_USER\\Software\\Microsoft\\Windows\\CurrentVersion\\Explorer")
        .expect("valid path");

    {
        let open = key.open(&registry).expect("open");
        assert_eq!(registry.stats().live(), 1);
        let _ = open.children().expect("enumerate").count();
    }
    let stats = registry.stats();
    assert_eq!(stats.opened, 1);
    assert_eq!(stats.closed, 1);
    assert_eq!(stats.live(), 0);
}

#[test]
fn test_release_on_panic() {
    let registry = demo_registry();
    let key = RegKey::parse("HKCU\\SOFTWARE\\Demo").expect("valid path");

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = key.with_open(&registry, |_open| -> winregal::Result<()> {
            panic!("fault inside scope");
        });
    }));
    assert!(result.is_err());

    let stats = registry.stats();
    assert_eq!(stats.opened, 1);
    assert_eq!(stats.live(), 0);
}

#[test]
fn test_enumeration_subkeys_before_values() {
    let registry = explorer_registry();
    let open = winregal::open(
        &registry,
        "HKEY_CURRENT_USER\\Software\\Microsoft\\Windows\\CurrentVersion\\Explorer\\Advanced",
    )
    .expect("open");

    let children: Vec<Child> = open
        .children()
        .expect("enumerate")
        .collect::<winregal::Result<_>>()
        .expect("all children");
    assert_eq!(children.len(), 3);
    assert!(matches!(&children[0], Child::Subkey(key) if key.name() == "Folder"));
    assert!(matches!(&children[1], Child::Value(v) if v.name() == "Hidden"));
    assert!(matches!(&children[2], Child::Value(v) if v.name() == "Start_TrackDocs"));

    // Subkeys come back as unopened child addresses.
    if let Child::Subkey(key) = &children[0] {
        assert_eq!(
            key.path(),
            "Software\\Microsoft\\Windows\\CurrentVersion\\Explorer\\Advanced\\Folder"
        );
    }
    assert_eq!(registry.stats().live(), 1);
}

#[test]
fn test_enumeration_is_repeatable_and_live() {
    let registry = demo_registry();
    let open = winregal::open(&registry, "HKCU\\SOFTWARE\\Demo").expect("open");

    let first: Vec<String> = open
        .into_iter()
        .map(|c| c.expect("child").name().to_string())
        .collect();
    assert_eq!(first, vec!["Child", "a"]);

    registry.set_value(Hive::CurrentUser, "SOFTWARE\\Demo", RegValue::new("b", 2u32));
    let second: Vec<String> = open
        .into_iter()
        .map(|c| c.expect("child").name().to_string())
        .collect();
    assert_eq!(second, vec!["Child", "a", "b"]);
}

#[test]
fn test_enumeration_tolerates_removal() {
    let registry = MemoryRegistry::new();
    for name in ["one", "two", "three"] {
        registry.set_value(Hive::Users, "k", RegValue::new(name, name));
    }
    let open = winregal::open(&registry, "HKEY_USERS\\k").expect("open");

    let mut children = open.children().expect("enumerate");
    let first = children.next().expect("first").expect("ok");
    assert_eq!(first.name(), "one");

    // Another process removes an entry mid-enumeration; the index runs off
    // the end and the sequence simply stops.
    assert!(registry.delete_value(Hive::Users, "k", "three"));
    let rest: Vec<String> = children.map(|c| c.expect("child").name().to_string()).collect();
    assert_eq!(rest, vec!["two"]);
}

#[test]
fn test_enumeration_error_is_yielded_once() {
    let registry = MemoryRegistry::new();
    registry.set_value(Hive::Users, "k", RegValue::new("v", 1u32));
    let open = winregal::open(&registry, "HKEY_USERS\\k").expect("open");

    let mut children = open.children().expect("enumerate");
    assert!(registry.delete_key(Hive::Users, "k"));
    assert!(matches!(children.next(), Some(Err(RegistryError::Os(_)))));
    assert!(children.next().is_none());
}

#[test]
fn test_lookup_value_subkey_and_missing() {
    let registry = explorer_registry();
    let open = winregal::open(
        &registry,
        "HKCU\\Software\\Microsoft\\Windows\\CurrentVersion\\Explorer\\Advanced",
    )
    .expect("open");

    match open.lookup("Hidden").expect("lookup") {
        Lookup::Value(value) => {
            assert_eq!(value.name(), "Hidden");
            assert_eq!(value.value_type(), ValueType::Dword);
            assert_eq!(value.data(), &ValueData::Dword(1));
        }
        other => panic!("expected value, got {:?}", other),
    }

    match open.get("Folder").expect("get") {
        Child::Subkey(key) => {
            assert_eq!(key.hive(), Hive::CurrentUser);
            assert_eq!(
                key.path(),
                "Software\\Microsoft\\Windows\\CurrentVersion\\Explorer\\Advanced\\Folder"
            );
        }
        other => panic!("expected subkey, got {:?}", other),
    }

    let err = open.get("DoesNotExist").unwrap_err();
    assert!(matches!(err, RegistryError::KeyNotFound { ref name } if name == "DoesNotExist"));

    // Subkey probes never leave handles behind.
    drop(open);
    assert_eq!(registry.stats().live(), 0);
}

#[test]
fn test_lookup_every_child_round_trips() {
    let registry = explorer_registry();
    let open = winregal::open(
        &registry,
        "HKCU\\Software\\Microsoft\\Windows\\CurrentVersion\\Explorer\\Advanced",
    )
    .expect("open");

    for child in open.children().expect("enumerate") {
        let child = child.expect("child");
        let looked_up = open.get(child.name()).expect("lookup");
        assert_eq!(looked_up, child);
    }
}

#[test]
fn test_materialize_is_stable_and_matches_children() {
    let registry = explorer_registry();
    let open = winregal::open(
        &registry,
        "HKCU\\Software\\Microsoft\\Windows\\CurrentVersion\\Explorer",
    )
    .expect("open");

    let first = open.to_map(&ExportOptions::default()).expect("export");
    let second = open.to_map(&ExportOptions::default()).expect("export");
    assert_eq!(first, second);

    let run_mru = first["RunMRU"].as_map().expect("RunMRU is a key");
    assert_eq!(run_mru["MRUList"].as_data(), Some(&ValueData::String("ba".to_string())));

    let advanced_key = open.subkey("Advanced").expect("Advanced");
    let advanced = advanced_key
        .with_open(&registry, |k| k.to_map(&ExportOptions::default()))
        .expect("export Advanced");
    assert_eq!(first["Advanced"], Entry::Key(advanced));

    let folder = first["Advanced"].as_map().unwrap()["Folder"].as_map().unwrap();
    assert_eq!(
        folder["Paths"].as_data().and_then(|d| d.as_strings()),
        Some(&["C:\\".to_string(), "D:\\".to_string()][..])
    );
}

#[test]
fn test_materialize_handle_discipline() {
    let registry = MemoryRegistry::new();
    // Four levels deep, three siblings wide at each level.
    fn build(registry: &MemoryRegistry, path: &str, depth: usize) {
        registry.set_value(Hive::LocalMachine, path, RegValue::new("depth", depth as u32));
        if depth == 4 {
            return;
        }
        for i in 0..3 {
            build(registry, &format!("{}\\n{}", path, i), depth + 1);
        }
    }
    build(&registry, "SOFTWARE\\Wide", 0);

    let open = winregal::open(&registry, "HKLM\\SOFTWARE\\Wide").expect("open");
    let map = open.to_map(&ExportOptions::default()).expect("export");
    drop(open);

    assert_eq!(map.len(), 4);
    let stats = registry.stats();
    // Root plus one handle per level below it.
    assert_eq!(stats.peak, 5);
    assert_eq!(stats.live(), 0);
    assert_eq!(stats.opened, 1 + 3 + 9 + 27 + 81);
}

#[test]
fn test_invalid_root_makes_no_backend_call() {
    let registry = demo_registry();
    let err = winregal::open(&registry, "BOGUS_HIVE\\Foo").unwrap_err();
    assert!(matches!(err, RegistryError::InvalidRoot { ref name } if name == "BOGUS_HIVE"));
    assert_eq!(registry.stats().open_calls, 0);

    assert!(matches!(
        "BOGUS_HIVE\\Foo".parse::<RegKey>(),
        Err(RegistryError::InvalidRoot { .. })
    ));
}

#[test]
fn test_missing_path_acquires_nothing() {
    let registry = demo_registry();
    let err = winregal::open(&registry, "HKCU\\SOFTWARE\\Nope").unwrap_err();
    assert!(err.is_not_found());

    let stats = registry.stats();
    assert_eq!(stats.open_calls, 1);
    assert_eq!(stats.opened, 0);
    assert_eq!(stats.live(), 0);
}

#[test]
fn test_permission_denied() {
    let registry = demo_registry();
    registry.deny_access(Hive::CurrentUser, "SOFTWARE\\Demo\\Child");

    let err = winregal::open(&registry, "HKCU\\SOFTWARE\\Demo\\Child").unwrap_err();
    assert!(matches!(
        err,
        RegistryError::PermissionDenied { ref path } if path == "HKEY_CURRENT_USER\\SOFTWARE\\Demo\\Child"
    ));

    // A denied subkey still exists, so lookup from the parent fails loudly
    // rather than reporting NotFound.
    let open = winregal::open(&registry, "HKCU\\SOFTWARE\\Demo").expect("open parent");
    assert!(matches!(open.lookup("Child"), Err(RegistryError::PermissionDenied { .. })));
}

#[test]
fn test_hive_root_is_openable() {
    let registry = demo_registry();
    let open = winregal::open(&registry, "HKEY_CURRENT_USER").expect("open hive root");
    assert_eq!(open.key().name(), "HKEY_CURRENT_USER");
    let info = open.info().expect("info");
    assert_eq!(info.subkey_count, 1);
    assert_eq!(info.value_count, 0);
}

#[test]
fn test_backend_trait_directly() {
    let registry = demo_registry();
    let handle = registry.open(Hive::CurrentUser, "SOFTWARE\\Demo").expect("open");
    assert_eq!(registry.enum_key(&handle, 0).expect("enum"), Some("Child".to_string()));
    assert_eq!(registry.enum_key(&handle, 1).expect("enum"), None);
    assert_eq!(
        registry.query_value(&handle, "A").expect("query"),
        Some(RegValue::new("a", "x"))
    );
    registry.close(handle);
    assert_eq!(registry.stats().live(), 0);
}

/// Deletes `victim` from `parent` right after enumeration first reports it,
/// as another process racing the export would.
struct VanishingSubkey<'a> {
    registry: &'a MemoryRegistry,
    hive: Hive,
    parent: &'a str,
    victim: &'a str,
    deleted: Cell<bool>,
}

impl RegistryBackend for VanishingSubkey<'_> {
    type Handle = MemoryHandle;

    fn open(&self, hive: Hive, path: &str) -> Result<MemoryHandle> {
        self.registry.open(hive, path)
    }

    fn info(&self, handle: &MemoryHandle) -> Result<KeyInfo> {
        self.registry.info(handle)
    }

    fn enum_key(&self, handle: &MemoryHandle, index: u32) -> Result<Option<String>> {
        let name = self.registry.enum_key(handle, index)?;
        if name.as_deref() == Some(self.victim) && !self.deleted.get() {
            self.deleted.set(true);
            let path = format!("{}\\{}", self.parent, self.victim);
            assert!(self.registry.delete_key(self.hive, &path));
        }
        Ok(name)
    }

    fn enum_value(&self, handle: &MemoryHandle, index: u32) -> Result<Option<RegValue>> {
        self.registry.enum_value(handle, index)
    }

    fn query_value(&self, handle: &MemoryHandle, name: &str) -> Result<Option<RegValue>> {
        self.registry.query_value(handle, name)
    }

    fn close(&self, handle: MemoryHandle) {
        self.registry.close(handle)
    }
}

#[test]
fn test_materialize_skips_vanished_subkey() {
    let registry = MemoryRegistry::new();
    registry.set_value(Hive::LocalMachine, "SOFTWARE\\Race\\Kept", RegValue::new("k", 1u32));
    registry.create_key(Hive::LocalMachine, "SOFTWARE\\Race\\Gone\\Deep");
    registry.set_value(Hive::LocalMachine, "SOFTWARE\\Race", RegValue::new("v", "x"));

    let backend = VanishingSubkey {
        registry: &registry,
        hive: Hive::LocalMachine,
        parent: "SOFTWARE\\Race",
        victim: "Gone",
        deleted: Cell::new(false),
    };
    let open = winregal::open(&backend, "HKLM\\SOFTWARE\\Race").expect("open");
    let map = open.to_map(&ExportOptions::default()).expect("export");

    assert!(backend.deleted.get());
    assert!(!map.contains_key("Gone"));
    assert_eq!(map.len(), 2);
    assert_eq!(
        map["Kept"].as_map().expect("subkey")["k"],
        Entry::Data(ValueData::Dword(1))
    );
    assert_eq!(map["v"], Entry::Data(ValueData::String("x".to_string())));

    drop(open);
    let stats = registry.stats();
    assert_eq!(stats.live(), 0);
    assert_eq!(stats.opened, 2);
}
