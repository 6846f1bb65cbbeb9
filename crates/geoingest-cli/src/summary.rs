use console::Style;
use geoingest_core::pipeline::{BatchItemResult, IngestConfig, IngestOutput};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
    error: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            error: Style::new().red().bold(),
        }
    }
}

pub fn print_config_summary(config: &IngestConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("GeoIngest"));
    println!("  {}", s.title.apply_to("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}"));
    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output_root.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Resampling"),
        s.method.apply_to(config.resampling_method)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Stretch"),
        s.value.apply_to(format!(
            "{}%-{}%",
            config.composite.stretch_low_percentile, config.composite.stretch_high_percentile
        ))
    );
    match config.composite.band_selection_override {
        Some(ref bands) => println!(
            "  {:<14}{}",
            s.label.apply_to("Bands"),
            s.value.apply_to(format!("{bands:?}"))
        ),
        None => println!(
            "  {:<14}{}",
            s.label.apply_to("Bands"),
            s.disabled.apply_to("sensor default")
        ),
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Tile size"),
        s.value.apply_to(config.tile_size)
    );
    println!();
}

pub fn print_output_summary(output: &IngestOutput) {
    let s = Styles::new();
    let meta = &output.metadata;

    println!("  {}", s.header.apply_to(&meta.name));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Sensor"),
        s.method.apply_to(meta.sensor.code())
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Size"),
        s.value.apply_to(format!("{}x{} ({} bands)", meta.width, meta.height, meta.band_count))
    );
    match (output.pyramid.min_zoom(), output.pyramid.max_zoom()) {
        (Some(min), Some(max)) => println!(
            "    {:<12}{}",
            s.label.apply_to("Zoom"),
            s.value.apply_to(format!("{min}-{max} ({} tiles)", output.pyramid.tile_count()))
        ),
        _ => println!("    {:<12}{}", s.label.apply_to("Zoom"), s.disabled.apply_to("none")),
    }
    println!(
        "    {:<12}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(output.output_dir.display())
    );
    println!();
}

pub fn print_batch_summary(results: &[BatchItemResult]) {
    let s = Styles::new();
    let failed = results.iter().filter(|r| !r.is_success()).count();

    println!("  {}", s.header.apply_to("Batch"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Succeeded"),
        s.value.apply_to(results.len() - failed)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Failed"),
        if failed == 0 {
            s.disabled.apply_to(failed.to_string())
        } else {
            s.error.apply_to(failed.to_string())
        }
    );
    for result in results {
        if let Err(ref e) = result.outcome {
            println!("    {} {}", s.error.apply_to(&result.name), e);
        }
    }
    println!();
}
