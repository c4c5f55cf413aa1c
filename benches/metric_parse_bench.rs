use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use rd_sweep::{parse_psnr, parse_ssim, parse_vmaf_filter, parse_vmaf_runner};

/// Roughly what a 600-frame comparison pass leaves on stderr.
fn filter_report(frames: usize, summary: &str) -> String {
    let mut text = String::from(
        "Input #0, rawvideo, from '/tmp/rd-sweep/clip.mp4.ref_640x360.yuv420p.yuv':\n  Duration: N/A, start: 0.000000, bitrate: 82944 kb/s\n",
    );
    for frame in 0..frames {
        text.push_str(&format!(
            "frame={frame:5} fps=312 q=-0.0 size=N/A time=00:00:{:02}.00 bitrate=N/A speed=10.4x\n",
            frame / 30 % 60
        ));
    }
    text.push_str(summary);
    text
}

fn bench_metric_parsers(c: &mut Criterion) {
    let psnr = filter_report(
        600,
        "[Parsed_psnr_0 @ 0x55d0c1a3b2c0] PSNR y:41.253821 u:45.221034 v:47.350118 average:42.362057 min:40.118433 max:44.001928\n",
    );
    let ssim = filter_report(
        600,
        "[Parsed_ssim_0 @ 0x5581] SSIM Y:0.979854 (16.957621) U:0.979630 (16.909614) V:0.983818 (17.910113) All:0.980478 (17.094663)\n",
    );
    let vmaf = filter_report(600, "[libvmaf @ 0x6000] VMAF score: 93.214870\n");
    let mut runner = String::new();
    for frame in 0..600 {
        runner.push_str(&format!(
            "Frame {frame}: VMAF_feature_adm2_score:0.95, VMAF_feature_motion2_score:3.2, VMAF_score:90.1\n"
        ));
    }
    runner.push_str("Aggregate: VMAF_feature_adm2_score:0.93, VMAF_score:87.654\n");

    let mut group = c.benchmark_group("metric_parse");
    group.throughput(Throughput::Bytes(psnr.len() as u64));
    group.bench_function("psnr", |b| b.iter(|| parse_psnr(black_box(&psnr))));
    group.bench_function("ssim", |b| b.iter(|| parse_ssim(black_box(&ssim))));
    group.bench_function("vmaf_filter", |b| {
        b.iter(|| parse_vmaf_filter(black_box(&vmaf)))
    });
    group.bench_function("vmaf_runner", |b| {
        b.iter(|| parse_vmaf_runner(black_box(&runner)))
    });
    group.finish();
}

criterion_group!(benches, bench_metric_parsers);
criterion_main!(benches);
