use gingham::detect;
use image::ImageReader;

#[cfg(feature = "tracing")]
use gingham::init_tracing;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    init_tracing(false, log::LevelFilter::Info);

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: detect_chessboard <image_path>");
        return Ok(());
    };

    let img = ImageReader::open(path)?.decode()?.to_luma8();
    let gray = detect::gray_from_image(&img)?;

    let points = detect::detect_chessboard(&gray, true, 1, true)?;
    if points.is_empty() {
        println!("no board detected");
    } else {
        println!("detected {} corners", points.len());
        for p in &points {
            println!("{:.3} {:.3} {}", p.x, p.y, p.refinement_level);
        }
    }

    Ok(())
}
