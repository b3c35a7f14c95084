// system-tests/tests/suites/ecr_enabled_flag.rs
// ============================================================================
// Module: Enabled Flag Live Tests
// Description: Deploys the component with `enabled = false`.
// Purpose: Assert a disabled component exposes and manages nothing.
// Dependencies: system-tests helpers
// ============================================================================

use helpers::live::open;
use system_tests::case::run_case;
use system_tests::fixtures::DEFAULT_STACK;
use system_tests::fixtures::disabled_case;
use system_tests::verify::check_disabled;

use crate::helpers;

#[tokio::test(flavor = "multi_thread")]
async fn disabled_component_creates_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let mut live = open("disabled_component_creates_nothing").await?;
    let case = disabled_case(live.config.stack_or(DEFAULT_STACK));
    let report =
        run_case(live.context.driver(), &case, async |deployment| check_disabled(deployment)).await;

    live.reporter.finish_case(&report)?;
    report.into_result()?;
    Ok(())
}
