use proptest::prelude::*;

use fleet_reconciler::models::{
    AgentHealth, AgentStatus, AlertSeverity, ChecksSummary, TaskHealth, TaskStatus,
};
use fleet_reconciler::state_machine::SyncStatus;

pub fn agent_status_strategy() -> impl Strategy<Value = AgentStatus> {
    prop_oneof![
        Just(AgentStatus::Online),
        Just(AgentStatus::Offline),
        Just(AgentStatus::Overdue),
    ]
}

pub fn checks_strategy() -> impl Strategy<Value = ChecksSummary> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(has_failing_checks, warning, failing)| ChecksSummary {
            has_failing_checks,
            warning,
            failing,
        },
    )
}

pub fn task_health_strategy() -> impl Strategy<Value = TaskHealth> {
    (
        prop_oneof![
            Just(TaskStatus::Passing),
            Just(TaskStatus::Failing),
            Just(TaskStatus::Pending),
        ],
        prop_oneof![
            Just(AlertSeverity::Info),
            Just(AlertSeverity::Warning),
            Just(AlertSeverity::Error),
        ],
    )
        .prop_map(|(status, alert_severity)| TaskHealth {
            status,
            alert_severity,
        })
}

pub fn agent_health_strategy() -> impl Strategy<Value = AgentHealth> {
    (
        1i64..10_000,
        agent_status_strategy(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        checks_strategy(),
        prop::collection::vec(task_health_strategy(), 0..4),
    )
        .prop_map(
            |(
                agent_id,
                status,
                maintenance_mode,
                overdue_email_alert,
                overdue_text_alert,
                checks,
                tasks,
            )| AgentHealth {
                agent_id,
                status,
                maintenance_mode,
                overdue_email_alert,
                overdue_text_alert,
                checks,
                tasks,
            },
        )
}

pub fn member_set_strategy() -> impl Strategy<Value = Vec<AgentHealth>> {
    prop::collection::vec(agent_health_strategy(), 0..12)
}

pub fn sync_status_strategy() -> impl Strategy<Value = SyncStatus> {
    prop::sample::select(SyncStatus::ALL.to_vec())
}
