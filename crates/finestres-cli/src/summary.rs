use std::path::Path;

use console::Style;
use finestres_core::calibration::{CalibrationConfig, CalibrationSet, SkippedFrame};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    warning: Style,
    path: Style,
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
            warning: Style::new().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_config_summary(dir: &Path, config: &CalibrationConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Finestres Masters"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(17)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(dir.display())
    );
    match config.output_dir {
        Some(ref out) => println!(
            "  {:<14}{}",
            s.label.apply_to("Output"),
            s.path.apply_to(out.display())
        ),
        None => println!(
            "  {:<14}{}",
            s.label.apply_to("Output"),
            s.disabled.apply_to("next to inputs")
        ),
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Darks"),
        s.method.apply_to(config.dark_method)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Flats"),
        s.method.apply_to(config.flat_method)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Existing"),
        if config.replace_existing {
            s.value.apply_to("replace")
        } else {
            s.disabled.apply_to("keep")
        }
    );
    if !config.save_masters {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Save"),
            s.disabled.apply_to("disabled")
        );
    }
    println!();
}

pub fn print_masters_summary(skipped: &[SkippedFrame], set: &CalibrationSet) {
    let s = Styles::new();

    if !skipped.is_empty() {
        println!("  {}", s.header.apply_to("Skipped"));
        for frame in skipped {
            println!(
                "    {:<28}{}",
                s.label.apply_to(&frame.title),
                s.warning.apply_to(&frame.reason)
            );
        }
        println!();
    }

    println!("  {}", s.header.apply_to("Master Darks"));
    if set.darks().next().is_none() {
        println!("    {}", s.disabled.apply_to("none"));
    }
    for (exposure, master) in set.darks() {
        println!(
            "    {:<12}{}",
            s.value.apply_to(exposure),
            s.path.apply_to(master.path().display())
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Master Flats"));
    if set.flats().next().is_none() {
        println!("    {}", s.disabled.apply_to("none"));
    }
    for (filter, master) in set.flats() {
        println!(
            "    {:<12}{}",
            s.value.apply_to(filter),
            s.path.apply_to(master.path().display())
        );
    }
    println!();
}
