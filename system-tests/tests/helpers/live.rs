// system-tests/tests/helpers/live.rs
// ============================================================================
// Module: Live Setup
// Description: Shared setup for suites that deploy into a real account.
// Purpose: Load config, install logging, and open the live suite context.
// Dependencies: system-tests
// ============================================================================

use system_tests::artifacts::TestReporter;
use system_tests::atmos::AtmosDriver;
use system_tests::config::SystemTestConfig;
use system_tests::context::SuiteContext;
use system_tests::logging::init_test_logging;
use system_tests::registry::EcrRegistryReader;

/// Everything a live case needs.
pub struct LiveCase {
    /// Loaded configuration.
    pub config: SystemTestConfig,
    /// Driver, reader, and registry address.
    pub context: SuiteContext<AtmosDriver, EcrRegistryReader>,
    /// Summary writer for the case.
    pub reporter: TestReporter,
}

/// Loads configuration and opens the live context for `test_name`.
pub async fn open(test_name: &str) -> Result<LiveCase, Box<dyn std::error::Error>> {
    let config = SystemTestConfig::load()?;
    init_test_logging(config.log_format)?;
    let reporter = TestReporter::new(&config, test_name)?;
    let context = SuiteContext::live(&config).await?;
    Ok(LiveCase {
        config,
        context,
        reporter,
    })
}
