// Minimal smoke run of the degradation pipeline on a synthetic frame

use std::time::Instant;

use lofi_cam::{
    degrade::{DegradationParams, DegradationPipeline},
    stream::{Dice, RandDice},
    video::Frame,
};
use rand::SeedableRng;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Testing lofi-cam degradation pipeline");

    // 1. Build a test pattern at webcam resolution
    let mut frame = Frame::new_black(640, 480);
    for y in 0..frame.height() {
        for x in 0..frame.width() {
            let stripe = if (x / 40 + y / 40) % 2 == 0 { 220 } else { 30 };
            frame.set_pixel(x, y, [stripe, (x % 256) as u8, (y % 256) as u8]);
        }
    }
    println!("   Source frame: {}", frame.dimensions());

    // 2. Degrade with the default settings
    let params = DegradationParams::default();
    params.validate()?;
    let pipeline = DegradationPipeline::with_jpeg(params);
    let mut rng = rand::rngs::SmallRng::seed_from_u64(42);

    let started = Instant::now();
    let degraded = pipeline.degrade(&frame, frame.dimensions(), &mut rng)?;
    let elapsed = started.elapsed();

    println!("   Degraded frame: {} in {:.1}ms", degraded.dimensions(), elapsed.as_secs_f64() * 1000.0);
    println!(
        "   Mean absolute difference: {:.1}",
        degraded.mean_abs_diff(&frame).unwrap_or_default()
    );

    // 3. Show what the drop decision looks like over a second of video
    let mut dice = RandDice::seeded(Some(42));
    let dropped = (0..30).filter(|_| dice.roll() < params.drop_rate).count();
    println!("   Dropped {} of 30 frames at drop rate {}", dropped, params.drop_rate);

    assert_eq!(degraded.dimensions(), frame.dimensions());
    println!("\nPipeline smoke run complete.");
    Ok(())
}
