/*!
# UPS DevKit - Test support for the UPS kernel and daemon

- Mock SNMP transport answering from a register table
- Recording action and report sinks
- Snapshot builders encoding readings through the real dialects
- State machine harness with action expectations
*/

pub mod mock_transport;
pub mod recording_sink;
pub mod state;
pub mod test_utils;

pub use mock_transport::{MockRequest, MockTransport, NO_SUCH_OBJECT};
pub use recording_sink::{RecordedReport, RecordingActionSink, RecordingReporter};
pub use test_utils::{init_tracing, SnapshotBuilder, TestHarness};
