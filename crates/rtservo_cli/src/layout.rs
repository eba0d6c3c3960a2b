//! `rtservo layout`: print the bus address map.

use rtservo_common::BitField;
use rtservo_config::BusLayout;
use serde::Serialize;

use crate::pipeline::load_servo_config;
use crate::{GlobalArgs, LayoutArgs, ReportFormat};

/// One named bit range.
#[derive(Debug, Serialize)]
struct FieldReport {
    name: &'static str,
    offset: u32,
    width: u32,
}

impl FieldReport {
    fn new(name: &'static str, field: BitField) -> Self {
        Self {
            name,
            offset: field.offset,
            width: field.width,
        }
    }
}

#[derive(Debug, Serialize)]
struct LayoutReport {
    address_width: u32,
    data_width: u32,
    address: Vec<FieldReport>,
    coeff_word: Vec<FieldReport>,
    state_word: Vec<FieldReport>,
    ctrl_word: Vec<FieldReport>,
}

fn report(layout: &BusLayout) -> LayoutReport {
    let profile = layout.profile_width();
    let engine_bits = layout.state_width() - layout.data_width();
    let mut state_word = Vec::new();
    if engine_bits > 0 {
        state_word.push(FieldReport::new("engine", BitField::new(0, engine_bits)));
    }
    state_word.push(FieldReport::new("exposed", layout.state_exposed_field()));

    LayoutReport {
        address_width: layout.address_width(),
        data_width: layout.data_width(),
        address: layout
            .address_fields()
            .into_iter()
            .map(|(name, field)| FieldReport::new(name, field))
            .collect(),
        coeff_word: vec![
            FieldReport::new("low", layout.coeff_half_field(false)),
            FieldReport::new("high", layout.coeff_half_field(true)),
        ],
        state_word,
        ctrl_word: vec![
            FieldReport::new("profile", BitField::new(0, profile)),
            FieldReport::new("en_out", BitField::bit(profile)),
            FieldReport::new("en_iir", BitField::bit(profile + 1)),
        ],
    }
}

fn render_text(report: &LayoutReport) -> String {
    let mut out = format!(
        "address ({} bits), data ({} bits)\n",
        report.address_width, report.data_width
    );
    let sections = [
        ("address", &report.address),
        ("coeff word", &report.coeff_word),
        ("state word", &report.state_word),
        ("ctrl word", &report.ctrl_word),
    ];
    for (title, fields) in sections {
        out.push_str(&format!("{title}:\n"));
        for f in fields {
            let range = BitField::new(f.offset, f.width).to_string();
            out.push_str(&format!("  {range:<9} {}\n", f.name));
        }
    }
    out
}

/// Runs the `rtservo layout` command.
pub fn run(args: &LayoutArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (config, _) = load_servo_config(global)?;
    let layout = BusLayout::resolve(&config.widths)?;
    let report = report(&layout);
    match args.format {
        ReportFormat::Text => print!("{}", render_text(&report)),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtservo_config::Widths;

    fn default_report() -> LayoutReport {
        report(&BusLayout::resolve(&Widths::default()).unwrap())
    }

    #[test]
    fn text_lists_select_bits() {
        let text = render_text(&default_report());
        assert!(text.starts_with("address (13 bits), data (18 bits)\n"));
        assert!(text.contains("  [12]      we\n"));
        assert!(text.contains("  [11]      state_sel\n"));
        assert!(text.contains("  [35:18]   high\n"));
        assert!(text.contains("  [6:0]     engine\n"));
        assert!(text.contains("  [24:7]    exposed\n"));
        assert!(text.contains("  [6]       en_iir\n"));
    }

    #[test]
    fn state_word_without_engine_bits() {
        let layout = BusLayout::resolve(&Widths {
            state: 18,
            ..Widths::default()
        })
        .unwrap();
        let r = report(&layout);
        assert_eq!(r.state_word.len(), 1);
        assert_eq!(r.state_word[0].name, "exposed");
    }

    #[test]
    fn json_report() {
        let json = serde_json::to_value(default_report()).unwrap();
        assert_eq!(json["address_width"], 13);
        assert_eq!(json["address"][0]["name"], "we");
        assert_eq!(json["address"][0]["offset"], 12);
        assert_eq!(json["coeff_word"][1]["offset"], 18);
    }
}
