#![allow(missing_docs)]
//! Priority-donation round trips, from one hop to transitive chains.

mod common;

use common::*;

#[test]
fn donation_boosts_holder_until_release() {
    init_test("donation_boosts_holder_until_release");
    let mut k = kernel();
    let main = k.running();
    let lock = k.lock_create();
    k.lock_acquire(lock);

    let donor = k.spawn("donor", 50, noop_entry, 0).unwrap();
    assert_eq!(k.running(), donor);
    k.lock_acquire(lock);
    // The donor blocked and its priority flowed to the holder.
    assert_eq!(k.running(), main);
    assert_with_log!(
        k.priority_of(main) == 50,
        "holder runs at donor priority",
        50,
        k.priority_of(main)
    );
    assert_eq!(k.base_priority_of(main), 31);
    assert_eq!(k.donation_count(), 1);

    test_section!("release refunds and hands the lock over");
    k.lock_release(lock);
    assert_eq!(k.running(), donor);
    assert_eq!(k.lock_holder(lock), Some(donor));
    assert_eq!(k.priority_of(main), 31);
    assert_eq!(k.donation_count(), 0);

    k.lock_release(lock);
    assert_eq!(k.running(), donor);
    test_complete!("donation_boosts_holder_until_release");
}

#[test]
fn transitive_chain_restores_in_stages() {
    init_test("transitive_chain_restores_in_stages");
    let mut k = kernel();
    // main plays the low thread of the low/mid/high chain.
    let low = k.running();
    k.set_priority(1);
    let lock_a = k.lock_create();
    let lock_b = k.lock_create();
    k.lock_acquire(lock_a);

    let mid = k.spawn("mid", 2, noop_entry, 0).unwrap();
    assert_eq!(k.running(), mid);
    k.lock_acquire(lock_b);
    k.lock_acquire(lock_a); // blocks on low; donates one hop
    assert_eq!(k.running(), low);
    assert_eq!(k.priority_of(low), 2);

    let high = k.spawn("high", 3, noop_entry, 0).unwrap();
    assert_eq!(k.running(), high);
    k.lock_acquire(lock_b); // blocks on mid; donates through to low
    assert_eq!(k.running(), low);

    test_section!("whole chain boosted to the high priority");
    assert_with_log!(k.priority_of(low) == 3, "low boosted transitively", 3, k.priority_of(low));
    assert_with_log!(k.priority_of(mid) == 3, "mid boosted directly", 3, k.priority_of(mid));
    assert_eq!(k.donation_count(), 3);

    test_section!("low releases: its boost unwinds, mid keeps the high boost");
    k.lock_release(lock_a);
    assert_eq!(k.running(), mid);
    assert_eq!(k.lock_holder(lock_a), Some(mid));
    assert_eq!(k.priority_of(low), 1);
    assert_eq!(k.priority_of(mid), 3);
    assert_eq!(k.donation_count(), 1);

    test_section!("mid finishes: releasing its locks restores it and wakes high");
    k.lock_release(lock_a);
    assert_eq!(k.running(), mid);
    k.lock_release(lock_b);
    assert_eq!(k.running(), high);
    assert_eq!(k.priority_of(mid), 2);
    assert_eq!(k.priority_of(high), 3);
    assert_eq!(k.donation_count(), 0);

    k.lock_release(lock_b);
    k.exit_current();
    assert_eq!(k.running(), mid);
    k.exit_current();
    assert_eq!(k.running(), low);
    test_complete!("transitive_chain_restores_in_stages");
}

#[test]
fn lowering_base_while_boosted_defers_until_refund() {
    init_test("lowering_base_while_boosted_defers_until_refund");
    let mut k = kernel();
    let main = k.running();
    let lock = k.lock_create();
    k.lock_acquire(lock);
    let donor = k.spawn("donor", 50, noop_entry, 0).unwrap();
    k.lock_acquire(lock);
    assert_eq!(k.running(), main);
    assert_eq!(k.priority_of(main), 50);

    k.set_priority(10);
    assert_with_log!(
        k.priority_of(main) == 50,
        "lowering under a boost leaves the effective value",
        50,
        k.priority_of(main)
    );
    assert_eq!(k.base_priority_of(main), 10);

    k.lock_release(lock);
    assert_eq!(k.running(), donor);
    assert_eq!(k.priority_of(main), 10);
    test_complete!("lowering_base_while_boosted_defers_until_refund");
}

#[test]
fn raising_priority_while_boosted_sticks() {
    init_test("raising_priority_while_boosted_sticks");
    let mut k = kernel();
    let main = k.running();
    let lock = k.lock_create();
    k.lock_acquire(lock);
    let _donor = k.spawn("donor", 40, noop_entry, 0).unwrap();
    k.lock_acquire(lock);
    assert_eq!(k.priority_of(main), 40);

    k.set_priority(50);
    assert_eq!(k.priority_of(main), 50);
    assert_eq!(k.base_priority_of(main), 50);
    k.lock_release(lock);
    // The raise outlives the refund.
    assert_eq!(k.priority_of(main), 50);
    assert_eq!(k.running(), main);
    test_complete!("raising_priority_while_boosted_sticks");
}

#[test]
fn donation_repositions_a_ready_holder() {
    init_test("donation_repositions_a_ready_holder");
    let mut k = kernel();
    k.set_priority(1);
    let lock = k.lock_create();

    let holder = k.spawn("holder", 20, noop_entry, 0).unwrap();
    assert_eq!(k.running(), holder);
    k.lock_acquire(lock);
    let between = k.spawn("between", 25, noop_entry, 0).unwrap();
    assert_eq!(k.running(), between);
    let donor = k.spawn("donor", 40, noop_entry, 0).unwrap();
    assert_eq!(k.running(), donor);

    // Ready queue: between (25) ahead of holder (20). The donation must
    // move the boosted holder in front of it.
    k.lock_acquire(lock);
    assert_with_log!(
        k.running() == holder,
        "boosted holder dispatched ahead of the 25-band",
        holder,
        k.running()
    );
    assert_eq!(k.priority_of(holder), 40);

    k.lock_release(lock);
    assert_eq!(k.running(), donor);
    assert_eq!(k.priority_of(holder), 20);
    let _ = between;
    test_complete!("donation_repositions_a_ready_holder");
}

#[test]
fn wait_lists_resort_for_donations_received_while_queued() {
    init_test("wait_lists_resort_for_donations_received_while_queued");
    let mut k = kernel();
    let main = k.running();
    let sema = k.sema_create(0);
    let lock = k.lock_create();

    let first = k.spawn("first", 40, noop_entry, 0).unwrap();
    assert_eq!(k.running(), first);
    k.sema_down(sema);
    assert_eq!(k.running(), main);

    let second = k.spawn("second", 35, noop_entry, 0).unwrap();
    assert_eq!(k.running(), second);
    k.lock_acquire(lock);
    k.sema_down(sema);
    assert_eq!(k.running(), main);

    // Boost the later, lower waiter above the first one while both sit on
    // the semaphore's wait list.
    let booster = k.spawn("booster", 60, noop_entry, 0).unwrap();
    assert_eq!(k.running(), booster);
    k.lock_acquire(lock);
    assert_eq!(k.running(), main);
    assert_eq!(k.priority_of(second), 60);

    k.sema_up(sema);
    assert_with_log!(
        k.running() == second,
        "wake picks the waiter that is highest now",
        second,
        k.running()
    );
    let _ = first;
    test_complete!("wait_lists_resort_for_donations_received_while_queued");
}

#[test]
fn no_donation_without_a_priority_gap() {
    init_test("no_donation_without_a_priority_gap");
    let mut k = kernel();
    let main = k.running();
    let lock = k.lock_create();
    k.lock_acquire(lock);
    let meek = k.spawn("meek", 20, noop_entry, 0).unwrap();
    assert_eq!(k.running(), main);

    k.sleep_until(5);
    // The lower-priority thread runs, blocks on the lock, donates nothing.
    assert_eq!(k.running(), meek);
    k.lock_acquire(lock);
    assert_eq!(k.running(), k.idle_thread());
    assert_eq!(k.donation_count(), 0);
    assert_eq!(k.priority_of(main), 31);

    for tick in 1..=5 {
        k.handle_tick(tick);
        k.yield_now();
    }
    assert_eq!(k.running(), main);
    k.lock_release(lock);
    assert_eq!(k.lock_holder(lock), Some(meek));
    test_complete!("no_donation_without_a_priority_gap");
}
