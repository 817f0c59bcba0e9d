#![allow(missing_docs)]
//! Semaphore, lock and condition-variable end-to-end behavior.

mod common;

use common::*;
use quantum::ThreadState;

#[test]
fn semaphore_ping_pong() {
    init_test("semaphore_ping_pong");
    let mut k = kernel();
    let main = k.running();
    let ping = k.sema_create(0);
    let pong = k.sema_create(0);

    // Equal priority: the helper, enqueued first, wins the band on spawn.
    let helper = k.spawn("helper", 31, noop_entry, 0).unwrap();
    assert_eq!(k.running(), helper);
    k.sema_down(ping);
    assert_eq!(k.running(), main);

    test_section!("round one");
    k.sema_up(ping); // wakes helper; the yield hands over within the band
    assert_eq!(k.running(), helper);
    k.sema_up(pong);
    assert_eq!(k.running(), main);
    k.sema_down(pong);
    assert_eq!(k.sema_value(pong), 0);

    test_section!("round two");
    assert_eq!(k.running(), main);
    k.yield_now();
    assert_eq!(k.running(), helper);
    k.sema_down(ping); // value 0 again: blocks
    assert_eq!(k.running(), main);
    k.sema_up(ping);
    assert_eq!(k.running(), helper);
    k.exit_current();
    assert_eq!(k.running(), main);
    test_complete!("semaphore_ping_pong");
}

#[test]
fn sema_try_down_never_blocks() {
    init_test("sema_try_down_never_blocks");
    let mut k = kernel();
    let sema = k.sema_create(2);
    assert!(k.sema_try_down(sema));
    assert!(k.sema_try_down(sema));
    assert!(!k.sema_try_down(sema));
    assert_eq!(k.sema_value(sema), 0);

    // Interrupt-safe by contract.
    k.interrupt_enter();
    assert!(!k.sema_try_down(sema));
    k.interrupt_exit();
    k.sema_up(sema);
    assert!(k.sema_try_down(sema));
    test_complete!("sema_try_down_never_blocks");
}

#[test]
fn sema_up_in_interrupt_defers_the_yield() {
    init_test("sema_up_in_interrupt_defers_the_yield");
    let mut k = kernel();
    let main = k.running();
    let sema = k.sema_create(0);
    let waiter = k.spawn("waiter", 50, noop_entry, 0).unwrap();
    assert_eq!(k.running(), waiter);
    k.sema_down(sema);
    assert_eq!(k.running(), main);

    k.interrupt_enter();
    k.sema_up(sema);
    assert_eq!(k.running(), main, "no dispatch inside the interrupt");
    assert_eq!(k.state_of(waiter), ThreadState::Ready);
    let preempt = k.interrupt_exit();
    assert!(preempt);
    k.yield_on_return();
    assert_eq!(k.running(), waiter);
    test_complete!("sema_up_in_interrupt_defers_the_yield");
}

#[test]
#[should_panic(expected = "interrupt context")]
fn sema_down_in_interrupt_panics() {
    let mut k = kernel();
    let sema = k.sema_create(1);
    k.interrupt_enter();
    k.sema_down(sema);
}

#[test]
#[should_panic(expected = "already held by the caller")]
fn recursive_lock_acquire_panics() {
    let mut k = kernel();
    let lock = k.lock_create();
    k.lock_acquire(lock);
    k.lock_acquire(lock);
}

#[test]
#[should_panic(expected = "not held by the caller")]
fn releasing_an_unheld_lock_panics() {
    let mut k = kernel();
    let lock = k.lock_create();
    k.lock_release(lock);
}

#[test]
#[should_panic(expected = "not held by the caller")]
fn releasing_another_threads_lock_panics() {
    let mut k = kernel();
    let lock = k.lock_create();
    let _holder = k.spawn("holder", 50, noop_entry, 0).unwrap();
    k.lock_acquire(lock); // acquired by the spawned thread
    k.block_current(); // back to main
    k.lock_release(lock);
}

#[test]
fn lock_try_acquire_reports_contention() {
    init_test("lock_try_acquire_reports_contention");
    let mut k = kernel();
    let main = k.running();
    let lock = k.lock_create();
    assert!(k.lock_try_acquire(lock));
    assert_eq!(k.lock_holder(lock), Some(main));

    let rival = k.spawn("rival", 50, noop_entry, 0).unwrap();
    assert_eq!(k.running(), rival);
    assert!(!k.lock_try_acquire(lock));
    k.exit_current();
    assert_eq!(k.running(), main);
    k.lock_release(lock);
    assert_eq!(k.lock_holder(lock), None);
    test_complete!("lock_try_acquire_reports_contention");
}

#[test]
fn cond_signal_wakes_highest_and_reacquires_mesa_style() {
    init_test("cond_signal_wakes_highest_and_reacquires_mesa_style");
    let mut k = kernel();
    let main = k.running();
    let lock = k.lock_create();
    let cond = k.cond_create();

    let modest = k.spawn("modest", 40, noop_entry, 0).unwrap();
    assert_eq!(k.running(), modest);
    k.lock_acquire(lock);
    k.cond_wait(cond, lock);
    assert_eq!(k.running(), main);

    let eager = k.spawn("eager", 45, noop_entry, 0).unwrap();
    assert_eq!(k.running(), eager);
    k.lock_acquire(lock);
    k.cond_wait(cond, lock);
    assert_eq!(k.running(), main);
    assert_eq!(k.cond_waiter_count(cond), 2);

    test_section!("signal under the lock; waiters requeue on the lock");
    k.lock_acquire(lock);
    k.cond_signal(cond, lock);
    // The woken waiter outranks the signaller and donates while it waits
    // for the lock.
    assert_eq!(k.priority_of(main), 45);
    assert_eq!(k.cond_waiter_count(cond), 1);
    k.cond_signal(cond, lock);
    assert_eq!(k.cond_waiter_count(cond), 0);

    test_section!("release hands the lock to the highest woken waiter");
    k.lock_release(lock);
    assert_with_log!(
        k.running() == eager,
        "highest-priority waiter wakes first",
        eager,
        k.running()
    );
    assert!(k.lock_held_by_current(lock));
    assert_eq!(k.priority_of(main), 31);

    k.lock_release(lock);
    assert_eq!(k.running(), eager);
    k.exit_current();
    assert_eq!(k.running(), modest);
    assert!(k.lock_held_by_current(lock));
    k.lock_release(lock);
    k.exit_current();
    assert_eq!(k.running(), main);
    test_complete!("cond_signal_wakes_highest_and_reacquires_mesa_style");
}

#[test]
fn cond_broadcast_wakes_everyone_by_priority() {
    init_test("cond_broadcast_wakes_everyone_by_priority");
    let mut k = kernel();
    let main = k.running();
    let lock = k.lock_create();
    let cond = k.cond_create();

    let low = k.spawn("low", 35, noop_entry, 0).unwrap();
    k.lock_acquire(lock);
    k.cond_wait(cond, lock);
    let high = k.spawn("high", 45, noop_entry, 0).unwrap();
    k.lock_acquire(lock);
    k.cond_wait(cond, lock);
    assert_eq!(k.running(), main);

    k.lock_acquire(lock);
    k.cond_broadcast(cond, lock);
    assert_eq!(k.cond_waiter_count(cond), 0);
    k.lock_release(lock);

    assert_eq!(k.running(), high);
    k.lock_release(lock);
    k.exit_current();
    assert_eq!(k.running(), low);
    k.lock_release(lock);
    k.exit_current();
    assert_eq!(k.running(), main);
    test_complete!("cond_broadcast_wakes_everyone_by_priority");
}

#[test]
#[should_panic(expected = "requires the associated lock")]
fn cond_wait_without_the_lock_panics() {
    let mut k = kernel();
    let lock = k.lock_create();
    let cond = k.cond_create();
    k.cond_wait(cond, lock);
}
