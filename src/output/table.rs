use std::io::Write;

use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};

use crate::common::MachineRecord;

const HEADERS: [&str; 8] = [
    "Cluster",
    "CPU",
    "Hash",
    "Memory (MB)",
    "GPUs",
    "Price/hr",
    "Region",
    "Storage (GB)",
];

fn machine_row(machine: &MachineRecord) -> Vec<Cell> {
    let number = |value: String| Cell::new(value).set_alignment(CellAlignment::Right);
    vec![
        Cell::new(&machine.cluster_name),
        Cell::new(&machine.cpu),
        Cell::new(&machine.hash),
        number(machine.memory.to_string()),
        number(machine.gpus.to_string()),
        number(format!("${:.3}", machine.price_per_hour)),
        Cell::new(&machine.region),
        number(machine.storage.to_string()),
    ]
}

fn machines_table(machines: &[MachineRecord]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(HEADERS);
    for machine in machines {
        table.add_row(machine_row(machine));
    }
    table
}

pub(super) fn write_table<W: Write>(
    out: &mut W,
    machines: &[MachineRecord],
) -> std::io::Result<()> {
    if machines.is_empty() {
        return writeln!(out, "No available machines.");
    }
    writeln!(out, "{}", machines_table(machines))
}
