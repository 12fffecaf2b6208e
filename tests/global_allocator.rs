//! Process-wide substitution through a real `#[global_allocator]`.
//!
//! Kept to a single test: the process context can only be created once.

use allocswap::{
    BinderPhase, CountingManager, EntryTable, HookTable, InstallationStatus, LifecycleBinder,
    LifecycleConfig, LifecycleError, ProcessContext,
};

#[global_allocator]
static ENTRY: EntryTable = EntryTable::system();

static MANAGER: CountingManager = CountingManager::new("counting");

#[test]
fn process_allocations_route_through_replacement() {
    let ctx = ProcessContext::init_global(&ENTRY, LifecycleConfig::default()).unwrap();
    assert_eq!(
        ProcessContext::init_global(&ENTRY, LifecycleConfig::default()).unwrap_err(),
        LifecycleError::GlobalContextExists
    );

    let host = HookTable::new();
    LifecycleBinder::new(ctx, &MANAGER).bind(&host).unwrap();
    host.load();

    assert_eq!(ctx.status(), InstallationStatus::Installed);
    assert_eq!(ctx.phase(), BinderPhase::Installed);
    assert_eq!(ENTRY.active().name(), "counting");

    let before = MANAGER.stats();
    let boxed = Box::new([7u8; 64]);
    let mut grown: Vec<u64> = Vec::with_capacity(4);
    grown.extend(0..1024);
    let text = String::from("served by the replacement manager");
    assert!(MANAGER.stats().allocations >= before.allocations + 3);

    drop((boxed, grown, text));
    assert!(MANAGER.stats().deallocations >= before.deallocations + 3);

    // Other threads allocate through the same entry points.
    let handle = std::thread::spawn(|| vec![1u32; 256].iter().sum::<u32>());
    assert_eq!(handle.join().unwrap(), 256);

    host.unload();
    assert_eq!(ctx.status(), InstallationStatus::Installed);
    assert_eq!(ENTRY.active().name(), "counting");
    assert_eq!(ProcessContext::global().map(|c| c.status()), Some(InstallationStatus::Installed));
}
