use super::*;
use crate::test_support::{Script, ScriptedLoader, solid_png};
use std::sync::atomic::Ordering;

fn loaded(script: Script, opts: RunOpts) -> EngineClient<ScriptedLoader> {
    let mut client = EngineClient::new(ScriptedLoader::new(script), opts);
    client.load().unwrap();
    client
}

#[test]
fn run_before_load_is_rejected() {
    let client = EngineClient::new(ScriptedLoader::new(Script::Grayscale), RunOpts::default());
    assert!(!client.is_ready());
    let err = client.run(solid_png(2, 2, [0, 0, 0, 255])).err().unwrap();
    assert!(matches!(err, SketchError::Rejected(_)), "{err}");
}

#[test]
fn failed_load_is_final() {
    let mut client = EngineClient::new(ScriptedLoader::failing("HTTP 404"), RunOpts::default());
    let err = client.load().unwrap_err();
    assert!(matches!(err, SketchError::EngineLoad(_)));
    assert_eq!(client.load_error(), Some("engine load error: HTTP 404"));

    let err = client.load().unwrap_err();
    assert!(matches!(err, SketchError::Rejected(_)), "{err}");
    assert!(!client.is_ready());
}

#[test]
fn loading_twice_is_rejected() {
    let mut client = loaded(Script::Grayscale, RunOpts::default());
    assert!(client.is_ready());
    assert!(matches!(client.load(), Err(SketchError::Rejected(_))));
}

#[test]
fn events_arrive_in_order_and_finish_last() {
    let client = loaded(Script::Grayscale, RunOpts::default());
    let updates: Vec<RunUpdate> = client.run(solid_png(3, 2, [255, 0, 0, 255])).unwrap().collect();

    let events: Vec<&EngineEvent> = updates
        .iter()
        .filter_map(|u| match u {
            RunUpdate::Event(e) => Some(e),
            RunUpdate::Finished(_) => None,
        })
        .collect();
    assert_eq!(events[0], &EngineEvent::Stage(RunStage::WritingInput));
    assert_eq!(events[1], &EngineEvent::Stage(RunStage::Converting));
    assert!(matches!(
        events[2],
        EngineEvent::Log(l) if l.contains("format=gray,edgedetect,negate")
    ));
    assert_eq!(events[3], &EngineEvent::Progress(0.5));
    assert_eq!(events[4], &EngineEvent::Progress(1.0));
    assert_eq!(events[5], &EngineEvent::Stage(RunStage::ReadingOutput));

    let Some(RunUpdate::Finished(Ok(out))) = updates.last() else {
        panic!("expected a successful final update");
    };
    let img = image::load_from_memory(out).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (3, 2));
    assert!(img.pixels().all(|p| p[0] == p[1] && p[1] == p[2]));
}

#[test]
fn repeated_runs_are_byte_identical() {
    // The sketch preset does not pass `-y`; stale output must be cleared between runs.
    let client = loaded(Script::Grayscale, RunOpts::for_preset(FilterPreset::Sketch));
    let input = solid_png(5, 5, [10, 200, 30, 255]);

    let first = client.run(input.clone()).unwrap().wait().unwrap();
    let second = client.run(input).unwrap().wait().unwrap();
    assert_eq!(first, second);
}

#[test]
fn engine_failure_is_reported_as_execution_error() {
    let client = loaded(Script::Fail("Invalid argument".to_owned()), RunOpts::default());
    let err = client
        .run(solid_png(2, 2, [0, 0, 0, 255]))
        .unwrap()
        .wait()
        .unwrap_err();
    assert!(matches!(err, SketchError::Execution(_)));
    assert!(err.to_string().contains("Invalid argument"));
}

#[test]
fn missing_output_is_an_error() {
    let client = loaded(Script::NoOutput, RunOpts::default());
    let err = client
        .run(solid_png(2, 2, [0, 0, 0, 255]))
        .unwrap()
        .wait()
        .unwrap_err();
    assert!(err.to_string().contains("output.png"), "{err}");
}

#[test]
fn slow_run_times_out_and_handle_stops() {
    let opts = RunOpts {
        preset: FilterPreset::Gray,
        timeout: Some(Duration::from_millis(50)),
    };
    let client = loaded(Script::Slow(Duration::from_millis(1500)), opts);

    let started = Instant::now();
    let mut handle = client.run(solid_png(2, 2, [0, 0, 0, 255])).unwrap();
    let finished = handle
        .by_ref()
        .find_map(|u| match u {
            RunUpdate::Finished(r) => Some(r),
            RunUpdate::Event(_) => None,
        })
        .unwrap();

    let err = finished.unwrap_err();
    assert!(err.is_timeout(), "{err}");
    assert!(started.elapsed() < Duration::from_millis(1000));
    assert!(handle.next().is_none());
}

#[test]
fn generous_timeout_does_not_fire() {
    let opts = RunOpts {
        preset: FilterPreset::Gray,
        timeout: Some(Duration::from_secs(30)),
    };
    let loader = ScriptedLoader::new(Script::Grayscale);
    let execs = Arc::clone(&loader.execs);
    let mut client = EngineClient::new(loader, opts);
    client.load().unwrap();

    assert!(client.run(solid_png(2, 2, [9, 9, 9, 255])).unwrap().wait().is_ok());
    assert_eq!(execs.load(Ordering::SeqCst), 1);
}

#[test]
fn run_opts_follow_preset_defaults() {
    assert_eq!(RunOpts::default().preset, FilterPreset::Sketch);
    assert_eq!(RunOpts::default().timeout, None);
    assert_eq!(
        RunOpts::for_preset(FilterPreset::Gray).timeout,
        Some(Duration::from_secs(30))
    );
}
