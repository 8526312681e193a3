use microkernel_sim::kernel::{ProcessState, TraceEvent, WaitReason};
use microkernel_sim::{ConfigError, SimulationConfig};

const WORKLOAD: &str = r#"
[[processes]]
pid = 1
burst_time = 10
memory_required = 30

[[processes]]
pid = 2
arrival_time = 2
burst_time = 4
memory_required = 20

[[processes]]
pid = 3
arrival_time = 4
burst_time = 6
memory_required = 40
"#;

fn with_policy(policy: &str) -> SimulationConfig {
    SimulationConfig::from_toml_str(&format!("[scheduler]\n{policy}\n{WORKLOAD}")).unwrap()
}

#[test]
fn test_fcfs_workload_from_config() {
    let report = with_policy("policy = \"fcfs\"").build().unwrap().run().unwrap();

    let completions: Vec<_> = report
        .completed
        .iter()
        .map(|m| (m.pid, m.completion_time))
        .collect();
    assert_eq!(completions, vec![(1, 10), (2, 14), (3, 20)]);
    assert_eq!(report.total_time, 20);
    assert_eq!(report.cpu_utilization(), 1.0);
}

#[test]
fn test_round_robin_workload_from_config() {
    let report = with_policy("policy = \"round_robin\"\nquantum = 3")
        .build()
        .unwrap()
        .run()
        .unwrap();

    let completions: Vec<_> = report
        .completed
        .iter()
        .map(|m| (m.pid, m.completion_time))
        .collect();
    assert_eq!(completions, vec![(2, 13), (3, 16), (1, 20)]);
    assert!(report.slices().iter().all(|(_, duration, _)| *duration <= 3));
}

#[test]
fn test_io_and_memory_pressure_drain() {
    let config = SimulationConfig::from_toml_str(
        r#"
        [scheduler]
        policy = "round_robin"
        quantum = 2

        [memory]
        total_size = 60

        [[processes]]
        pid = 1
        burst_time = 4
        memory_required = 40

        [[processes.io]]
        device = "PRINTER"
        duration = 3
        operation = "write"

        [[processes]]
        pid = 2
        burst_time = 3
        memory_required = 30
        "#,
    )
    .unwrap();

    let mut dispatcher = config.build().unwrap();
    let report = dispatcher.run().unwrap();

    assert_eq!(report.completed.len(), 2);
    assert!(report.trace.iter().any(|event| matches!(
        event,
        TraceEvent::Transition {
            pid: 2,
            to: ProcessState::Waiting(WaitReason::Memory),
            ..
        }
    )));
    assert!(report.trace.iter().any(|event| matches!(
        event,
        TraceEvent::IoCompleted { pid: 1, device, .. } if device == "PRINTER"
    )));
    for metrics in &report.completed {
        let ran: u32 = report
            .slices()
            .iter()
            .filter(|(pid, _, _)| *pid == metrics.pid)
            .map(|(_, duration, _)| duration)
            .sum();
        assert_eq!(ran, metrics.burst_time);
    }
    assert_eq!(dispatcher.memory().get_free_memory(), 60);
    assert!(dispatcher.memory().snapshot().is_tiled());
}

#[test]
fn test_config_without_devices() {
    let config = SimulationConfig::from_toml_str(
        r#"
        [io]
        devices = []

        [limits]
        max_ticks = 5
        "#,
    )
    .unwrap();
    assert!(config.build().unwrap().run().unwrap().completed.is_empty());

    let err = SimulationConfig::from_toml_str(
        r#"
        [io]
        devices = []

        [[processes]]
        pid = 1
        burst_time = 1
        memory_required = 1

        [[processes.io]]
        device = "DISK"
        duration = 1
        operation = "read"
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownDevice { pid: 1, .. }));
}

#[test]
fn test_missing_config_file() {
    let err = SimulationConfig::from_file("does/not/exist.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}
