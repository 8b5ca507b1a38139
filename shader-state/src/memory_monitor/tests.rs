//! Tests for ShaderMemoryMonitor

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::*;

const ESTIMATE: usize = 3584;

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

fn monitor(t0: Instant) -> ShaderMemoryMonitor {
    ShaderMemoryMonitor::new(MemoryConfig::default(), t0)
}

#[test]
fn test_register_estimates_split() {
    let t0 = Instant::now();
    let monitor = monitor(t0);
    monitor.register_shader(ProgramId(1), "basic", t0);

    let info = monitor.shader_info(ProgramId(1)).unwrap();
    assert_eq!(info.name, "basic");
    assert_eq!(info.total_memory, ESTIMATE);
    assert_eq!(info.program_size, 2150);
    assert_eq!(info.uniform_size, 1075);
    assert_eq!(info.texture_size, 358);
    assert_eq!(info.access_count, 1);
    assert!(info.active);
    assert_eq!(monitor.total_memory_usage(), ESTIMATE);
}

#[test]
fn test_register_without_detailed_tracking() {
    let t0 = Instant::now();
    let monitor = monitor(t0);
    monitor.set_detailed_tracking(false);
    monitor.register_shader(ProgramId(1), "basic", t0);
    monitor.register_shader(ProgramId::NONE, "nothing", t0);

    assert_eq!(monitor.shader_memory_usage(ProgramId(1)), 0);
    assert_eq!(monitor.tracked_shaders(), 1);
}

#[test]
fn test_unregister() {
    let t0 = Instant::now();
    let monitor = monitor(t0);
    monitor.register_shader(ProgramId(1), "basic", t0);

    assert_eq!(monitor.unregister_shader(ProgramId(1)).map(|info| info.name), Some("basic".into()));
    assert!(monitor.unregister_shader(ProgramId(1)).is_none());
    assert_eq!(monitor.total_memory_usage(), 0);
    assert_eq!(monitor.shader_memory_usage(ProgramId(1)), 0);
}

#[test]
fn test_record_access_and_measured_sizes() {
    let t0 = Instant::now();
    let monitor = monitor(t0);
    monitor.register_shader(ProgramId(2), "water", t0);

    monitor.record_access(ProgramId(2), t0 + secs(5));
    monitor.record_access(ProgramId(99), t0 + secs(5));
    monitor.update_memory_usage(ProgramId(2), 4000, 500, 100);

    let info = monitor.shader_info(ProgramId(2)).unwrap();
    assert_eq!(info.access_count, 2);
    assert_eq!(info.last_accessed, t0 + secs(5));
    assert_eq!(info.total_memory, 4600);
    assert!(monitor.shader_info(ProgramId(99)).is_none());
}

#[test]
fn test_optimize_marks_idle_shaders_inactive() {
    let t0 = Instant::now();
    let monitor = monitor(t0);
    monitor.register_shader(ProgramId(1), "old", t0);
    monitor.register_shader(ProgramId(2), "recent", t0 + secs(30));

    monitor.optimize(t0 + secs(61));
    assert!(!monitor.shader_info(ProgramId(1)).unwrap().active);
    assert!(monitor.shader_info(ProgramId(2)).unwrap().active);

    monitor.record_access(ProgramId(1), t0 + secs(62));
    assert!(monitor.shader_info(ProgramId(1)).unwrap().active);
}

#[test]
fn test_unused_shaders() {
    let t0 = Instant::now();
    let monitor = monitor(t0);
    monitor.register_shader(ProgramId(3), "c", t0);
    monitor.register_shader(ProgramId(1), "a", t0);
    monitor.register_shader(ProgramId(2), "b", t0 + secs(100));

    let now = t0 + secs(120);
    assert_eq!(monitor.unused_shaders(secs(60), now), vec![ProgramId(1), ProgramId(3)]);
    assert_eq!(monitor.unused_shaders(secs(120), now), Vec::<ProgramId>::new());
}

#[test]
fn test_low_priority_order() {
    let t0 = Instant::now();
    let monitor = monitor(t0);
    monitor.register_shader(ProgramId(1), "busy", t0);
    for _ in 0..10 {
        monitor.record_access(ProgramId(1), t0);
    }
    monitor.register_shader(ProgramId(2), "rare", t0);
    monitor.register_shader(ProgramId(3), "fresh", t0 + secs(120));

    // At +120s: busy 11 / 3 = 3, rare 1 / 3 = 0, fresh 1 / 1 = 1
    let order = monitor.low_priority_shaders(t0 + secs(120));
    assert_eq!(order, vec![ProgramId(2), ProgramId(3), ProgramId(1)]);
}

#[test]
fn test_suggest_for_unload_stops_at_target() {
    let t0 = Instant::now();
    let monitor = monitor(t0);
    for id in 1..=3 {
        monitor.register_shader(ProgramId(id), format!("s{id}"), t0);
        monitor.update_memory_usage(ProgramId(id), 1000, 0, 0);
    }

    let now = t0 + secs(1);
    assert_eq!(monitor.suggest_for_unload(1500, now), vec![ProgramId(1), ProgramId(2)]);
    assert_eq!(monitor.suggest_for_unload(1000, now), vec![ProgramId(1)]);
    assert_eq!(monitor.suggest_for_unload(10_000, now).len(), 3);
}

#[test]
fn test_memory_stats() {
    let t0 = Instant::now();
    let monitor = monitor(t0);
    monitor.register_shader(ProgramId(1), "small", t0);
    monitor.register_shader(ProgramId(2), "large", t0 + secs(100));
    monitor.update_memory_usage(ProgramId(1), 1000, 0, 0);
    monitor.update_memory_usage(ProgramId(2), 2000, 800, 200);

    monitor.optimize(t0 + secs(100));
    let stats = monitor.memory_stats();
    assert_eq!(stats.total_shader_memory, 3000);
    assert_eq!(stats.total_uniform_memory, 800);
    assert_eq!(stats.total_texture_memory, 200);
    assert_eq!(stats.active_shaders, 1);
    assert_eq!(stats.inactive_shaders, 1);
    assert_eq!(stats.top_memory_consumers, vec![ProgramId(2), ProgramId(1)]);
    assert!((stats.memory_fragmentation - 0.25).abs() < 1e-6);
    assert_eq!(stats.peak_memory_usage, 4000);

    monitor.unregister_shader(ProgramId(2));
    let stats = monitor.memory_stats();
    assert_eq!(stats.peak_memory_usage, 4000);
    assert_eq!(stats.top_memory_consumers, vec![ProgramId(1)]);
}

#[test]
fn test_top_consumers_capped_at_five() {
    let t0 = Instant::now();
    let monitor = monitor(t0);
    for id in 1..=7u32 {
        monitor.register_shader(ProgramId(id), format!("s{id}"), t0);
        monitor.update_memory_usage(ProgramId(id), id as usize * 100, 0, 0);
    }
    let top = monitor.memory_stats().top_memory_consumers;
    assert_eq!(
        top,
        vec![ProgramId(7), ProgramId(6), ProgramId(5), ProgramId(4), ProgramId(3)]
    );
}

#[test]
fn test_threshold_callbacks() {
    let t0 = Instant::now();
    let monitor = monitor(t0);
    monitor.set_memory_threshold(5000);
    assert_eq!(monitor.memory_threshold(), 5000);

    let exceeded = Arc::new(Mutex::new(Vec::new()));
    let unloads = Arc::new(Mutex::new(Vec::new()));
    {
        let exceeded = Arc::clone(&exceeded);
        monitor.set_threshold_callback(move |current, threshold| {
            exceeded.lock().unwrap().push((current, threshold));
        });
        let unloads = Arc::clone(&unloads);
        monitor.set_unload_callback(move |program| unloads.lock().unwrap().push(program));
    }

    monitor.register_shader(ProgramId(1), "a", t0);
    monitor.update(t0 + secs(1));
    assert!(exceeded.lock().unwrap().is_empty());

    monitor.register_shader(ProgramId(2), "b", t0 + secs(1));
    monitor.update(t0 + secs(2));

    // 7168 over 5000: shedding toward 4000 needs one program
    assert_eq!(*exceeded.lock().unwrap(), vec![(2 * ESTIMATE, 5000)]);
    assert_eq!(*unloads.lock().unwrap(), vec![ProgramId(1)]);
}

#[test]
fn test_unload_callback_can_reenter_monitor() {
    let t0 = Instant::now();
    let monitor = Arc::new(monitor(t0));
    monitor.set_memory_threshold(5000);

    let weak = Arc::downgrade(&monitor);
    monitor.set_unload_callback(move |program| {
        if let Some(monitor) = weak.upgrade() {
            monitor.unregister_shader(program);
        }
    });

    monitor.register_shader(ProgramId(1), "a", t0);
    monitor.register_shader(ProgramId(2), "b", t0);
    monitor.update(t0 + secs(1));

    assert_eq!(monitor.tracked_shaders(), 1);
    assert!(monitor.shader_info(ProgramId(2)).is_some());
}

#[test]
fn test_update_runs_optimization_on_interval() {
    let t0 = Instant::now();
    let monitor = monitor(t0);
    monitor.register_shader(ProgramId(1), "a", t0);

    monitor.update(t0 + secs(59));
    assert!(monitor.shader_info(ProgramId(1)).unwrap().active);

    // Interval reached and the shader has been idle past the active window
    monitor.update(t0 + secs(61));
    assert!(!monitor.shader_info(ProgramId(1)).unwrap().active);
}

#[test]
fn test_update_respects_auto_optimization_toggle() {
    let t0 = Instant::now();
    let monitor = monitor(t0);
    monitor.set_auto_optimization(false);
    monitor.register_shader(ProgramId(1), "a", t0);

    monitor.update(t0 + secs(600));
    assert!(monitor.shader_info(ProgramId(1)).unwrap().active);
}

#[test]
fn test_clear() {
    let t0 = Instant::now();
    let monitor = monitor(t0);
    let calls = Arc::new(AtomicUsize::new(0));
    {
        let calls = Arc::clone(&calls);
        monitor.set_threshold_callback(move |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
        });
    }
    monitor.register_shader(ProgramId(1), "a", t0);
    monitor.memory_stats();

    monitor.clear();
    assert_eq!(monitor.tracked_shaders(), 0);
    assert_eq!(monitor.memory_stats(), ShaderMemoryStats::default());

    monitor.set_memory_threshold(0);
    monitor.register_shader(ProgramId(2), "b", t0);
    monitor.update(t0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_concurrent_access() {
    let t0 = Instant::now();
    let monitor = monitor(t0);

    std::thread::scope(|scope| {
        for worker in 0..4u32 {
            let monitor = &monitor;
            scope.spawn(move || {
                for i in 0..25u32 {
                    let program = ProgramId(worker * 100 + i + 1);
                    monitor.register_shader(program, format!("w{worker}-{i}"), t0);
                    monitor.record_access(program, t0 + secs(1));
                }
            });
        }
    });

    assert_eq!(monitor.tracked_shaders(), 100);
    assert_eq!(monitor.total_memory_usage(), 100 * ESTIMATE);
    assert_eq!(monitor.shader_info(ProgramId(1)).unwrap().access_count, 2);
}
