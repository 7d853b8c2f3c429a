//! Save-state round-tripping (§6): serializing, running further, then
//! restoring the earlier snapshot must put every subsystem back exactly
//! where it was, byte for byte.

mod common;

use common::new_gameboy;

#[test]
fn deserialize_restores_byte_identical_state() {
    let mut gb = new_gameboy();
    gb.run_for_cycles(1_000);

    let snapshot = gb.serialize();

    gb.run_for_cycles(50_000);
    let diverged = gb.serialize();
    assert_ne!(snapshot, diverged, "continuing to run must change machine state");

    gb.deserialize(&snapshot).expect("a snapshot this process just produced must load cleanly");
    let restored = gb.serialize();

    assert_eq!(snapshot, restored, "restoring a snapshot must reproduce it exactly on re-serialize");
}

#[test]
fn deserialize_rejects_corrupted_magic() {
    let gb_snapshot = new_gameboy().serialize();
    let mut corrupted = gb_snapshot.clone();
    // The magic sits right after the fixed-length tag field.
    corrupted[27] ^= 0xFF;

    let mut gb = new_gameboy();
    let result = gb.deserialize(&corrupted);
    assert!(result.is_err(), "flipping the magic bytes must be rejected rather than silently accepted");
}
