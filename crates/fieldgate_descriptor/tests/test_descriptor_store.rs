// Fieldgate Rust Source Code File
//
// Copyright 2024-2026 Fieldgate Project Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use fieldgate_descriptor::{builtin, DescriptorStore};

#[test]
fn store_round_trips_every_builtin() {
  let dir = tempfile::tempdir().unwrap();
  let store = DescriptorStore::open(dir.path()).unwrap();
  for descriptor in builtin::all() {
    store.insert(descriptor).unwrap();
  }
  assert_eq!(store.len(), 4);

  // A second store over the same directory must reproduce the state exactly.
  let reloaded = DescriptorStore::open(dir.path()).unwrap();
  assert_eq!(reloaded.len(), 4);
  for descriptor in builtin::all() {
    let loaded = reloaded.get(descriptor.device_id()).unwrap();
    assert_eq!(*loaded, descriptor);
  }
}

#[test]
fn descriptor_files_are_deterministic() {
  let dir = tempfile::tempdir().unwrap();
  let store = DescriptorStore::open(dir.path()).unwrap();
  let descriptor = builtin::sensirion_sht40();
  store.insert(descriptor.clone()).unwrap();
  let path = dir.path().join("sensirion_sht40.json");
  let first = std::fs::read(&path).unwrap();
  store.insert(descriptor).unwrap();
  let second = std::fs::read(&path).unwrap();
  assert_eq!(first, second);
}

#[test]
fn insert_replaces_same_device_id() {
  let store = DescriptorStore::ephemeral();
  store.insert(builtin::sensirion_sht40()).unwrap();
  store.insert(builtin::sensirion_sht40()).unwrap();
  assert_eq!(store.len(), 1);
}

#[test]
fn lookup_by_make_and_model() {
  let store = DescriptorStore::ephemeral();
  store.insert(builtin::honeywell_t6_pro()).unwrap();
  let found = store.get_by_make_model("Honeywell", "T6 Pro").unwrap();
  assert_eq!(found.device_id(), "honeywell_t6_pro");
  assert!(store.get_by_make_model("Honeywell", "T9").is_none());
}

#[test]
fn known_parameters_union() {
  let store = DescriptorStore::ephemeral();
  store.insert(builtin::sensirion_sht40()).unwrap();
  store.insert(builtin::honeywell_t6_pro()).unwrap();
  let names = store.known_parameters();
  assert!(names.contains(&"temperature".to_owned()));
  assert!(names.contains(&"room_temperature".to_owned()));
  assert!(names.contains(&"setpoint".to_owned()));
}
