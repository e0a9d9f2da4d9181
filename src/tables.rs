use chrono::NaiveDate;
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::core::{
    blackout::BlackoutSet,
    grid::Bucket,
    sample::NormalizedSample,
    select::Window,
    slot::HalfHourSlot,
    tariff::{Period, RateTable},
};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

/// Why the bucket may or may not host the window.
fn eligibility(bucket: &Bucket, blackout: &BlackoutSet) -> Cell {
    if bucket.period == Period::Peak {
        Cell::new("peak").fg(Color::Red)
    } else if blackout.forbids(bucket.start) {
        Cell::new("blackout").fg(Color::Magenta)
    } else if bucket.has_resets() {
        Cell::new("reset").fg(Color::Red).add_attribute(Attribute::Bold)
    } else {
        Cell::new("eligible").fg(Color::Green)
    }
}

pub fn build_buckets_table(
    buckets: &[Bucket],
    rates: &RateTable,
    blackout: &BlackoutSet,
    window: Option<&Window>,
) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Grid", "Start", "End", "Period", "Consumption", "Cost", "Eligibility"]);
    for bucket in buckets {
        let is_selected =
            window.is_some_and(|window| window.grid == bucket.grid && window.start == bucket.start);
        let cost = rates.get(bucket.period).map(|rate| bucket.consumption * rate);
        let mut row = vec![
            Cell::new(bucket.grid).add_attribute(Attribute::Dim),
            Cell::new(bucket.start.format("%a %H:%M")),
            Cell::new(bucket.end.format("%H:%M")).add_attribute(Attribute::Dim),
            Cell::new(bucket.period).fg(bucket.period.color()),
            Cell::new(bucket.consumption).set_alignment(CellAlignment::Right),
            cost.map_or_else(|| Cell::new("-"), Cell::new).set_alignment(CellAlignment::Right),
            eligibility(bucket, blackout),
        ];
        if is_selected {
            row = row.into_iter().map(|cell| cell.add_attribute(Attribute::Reverse)).collect();
        }
        table.add_row(row);
    }
    table
}

pub fn build_slots_table(date: NaiveDate, blackout: &BlackoutSet) -> Table {
    let mut table = new_table();
    table.set_header(vec!["#", "Slot", "Period", "Blackout"]);
    for slot in HalfHourSlot::iter() {
        let period = Period::of(date.and_time(slot.start_time()));
        let is_blackout = blackout.contains(slot);
        table.add_row(vec![
            Cell::new(slot.index())
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
            Cell::new(slot),
            Cell::new(period).fg(period.color()),
            if is_blackout { Cell::new("yes").fg(Color::Magenta) } else { Cell::new("") },
        ]);
    }
    table
}

pub fn build_samples_table(samples: &[NormalizedSample]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Time", "Counter", "Difference"]);
    let mut previous = None;
    for sample in samples {
        let difference = previous.map(|previous| sample.counter - previous);
        table.add_row(vec![
            Cell::new(sample.local_time.format("%Y-%m-%d %H:%M:%S %Z")),
            Cell::new(sample.counter).set_alignment(CellAlignment::Right),
            difference.map_or_else(
                || Cell::new(""),
                |difference| {
                    Cell::new(difference).set_alignment(CellAlignment::Right).fg(
                        if difference.0 < 0.0 { Color::Red } else { Color::Reset },
                    )
                },
            ),
        ]);
        previous = Some(sample.counter);
    }
    table
}
