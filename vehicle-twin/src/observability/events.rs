//! Canonical structured event names used across `vehicle-twin`.

// Fragment ingress and correlation events.
pub const FRAGMENT_RECEIVE: &str = "fragment_receive";
pub const FRAGMENT_DROP_MALFORMED: &str = "fragment_drop_malformed";
pub const FRAGMENT_IGNORED_CHANNEL: &str = "fragment_ignored_channel";
pub const PENDING_CREATE: &str = "pending_create";
pub const MERGE_START: &str = "merge_start";
pub const MERGE_OK: &str = "merge_ok";
pub const MERGE_WRITE_RETAINED: &str = "merge_write_retained";
pub const MERGE_WRITE_ABANDONED: &str = "merge_write_abandoned";
pub const PENDING_EXPIRED: &str = "pending_expired";
pub const SWEEP_SUMMARY: &str = "sweep_summary";

// Plugin lifecycle events.
pub const PLUGIN_SKIP_DISABLED: &str = "plugin_skip_disabled";
pub const PLUGIN_START_OK: &str = "plugin_start_ok";
pub const PLUGIN_START_FAILED: &str = "plugin_start_failed";
pub const PLUGIN_CAPABILITY_MISSING: &str = "plugin_capability_missing";
pub const PLUGIN_STOP: &str = "plugin_stop";
pub const PLUGIN_LOAD_SUMMARY: &str = "plugin_load_summary";

// RPC events.
pub const RPC_REQUEST_REJECTED: &str = "rpc_request_rejected";
pub const RPC_RESPONSE_SENT: &str = "rpc_response_sent";
pub const RPC_RESPONSE_SEND_FAILED: &str = "rpc_response_send_failed";
pub const RPC_CALL_START: &str = "rpc_call_start";
pub const RPC_CALL_OK: &str = "rpc_call_ok";
pub const RPC_CALL_TIMEOUT: &str = "rpc_call_timeout";
pub const RPC_UNSUBSCRIBE_FAILED: &str = "rpc_unsubscribe_failed";

// Trigger and sink events.
pub const TRIGGER_READ_FAILED: &str = "trigger_read_failed";
pub const TRIGGER_PUBLISH_FAILED: &str = "trigger_publish_failed";
pub const TRIGGER_REPUBLISHED: &str = "trigger_republished";
pub const SINK_WRITE_OK: &str = "sink_write_ok";
pub const SINK_WRITE_FAILED: &str = "sink_write_failed";

// Runtime events.
pub const TASK_SPAWN: &str = "task_spawn";
pub const TASK_EXIT: &str = "task_exit";
pub const TASK_PANIC: &str = "task_panic";
pub const LISTENER_QUEUE_CLOSED: &str = "listener_queue_closed";
