//! Mock construction helpers

use mockall::{mock, Sequence};
use pullgraph_rs::pipeline::Lifecycle;

mock! {
    pub Hook {}

    impl Lifecycle for Hook {
        fn on_start(&mut self) -> anyhow::Result<()>;
        fn on_end(&mut self) -> anyhow::Result<()>;
    }
}

/// Hook expecting exactly one successful start and one end
pub fn hook_once() -> MockHook {
    let mut hook = MockHook::new();
    hook.expect_on_start().times(1).returning(|| Ok(()));
    hook.expect_on_end().times(1).returning(|| Ok(()));
    hook
}

/// Expect every hook to start once in slice order, then end once in the
/// same order
pub fn expect_ordered(hooks: &mut [MockHook], seq: &mut Sequence) {
    for hook in hooks.iter_mut() {
        hook.expect_on_start()
            .times(1)
            .in_sequence(seq)
            .returning(|| Ok(()));
    }
    for hook in hooks.iter_mut() {
        hook.expect_on_end()
            .times(1)
            .in_sequence(seq)
            .returning(|| Ok(()));
    }
}

/// Hook whose start fails; its end must never run
pub fn failing_start() -> MockHook {
    let mut hook = MockHook::new();
    hook.expect_on_start()
        .times(1)
        .returning(|| Err(anyhow::anyhow!("device unavailable")));
    hook.expect_on_end().never();
    hook
}
