use splitbrain_core::cell::{CellRef, Shape, Strides};
use splitbrain_core::{CellId, CompileError, Operator, Result};

/// Field delimiter inside an operator record.
pub const OP_DELIM: char = ';';
/// Sub-field delimiter inside a cell reference.
pub const CELL_DELIM: char = ':';
/// Field delimiter inside a probe record.
pub const PROBE_DELIM: char = '|';

/// Strip characters that would collide with the record delimiters. Spaces
/// and parentheses are dropped outright (labels frequently carry pretty
/// names); delimiter characters become underscores.
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| !matches!(c, ' ' | '(' | ')'))
        .map(|c| {
            if c == OP_DELIM || c == CELL_DELIM || c == PROBE_DELIM {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Canonical cell-reference encoding: `key:rows,cols:row_stride,col_stride:offset`.
pub fn encode_cell_ref(cell: &CellRef) -> String {
    format!(
        "{}{d}{},{}{d}{},{}{d}{}",
        cell.key.key(),
        cell.shape.rows,
        cell.shape.cols,
        cell.strides.row,
        cell.strides.col,
        cell.offset,
        d = CELL_DELIM,
    )
}

pub fn decode_cell_ref(text: &str) -> Result<CellRef> {
    let parts: Vec<&str> = text.split(CELL_DELIM).collect();
    if parts.len() != 4 {
        return Err(invalid(text, "cell reference needs 4 fields"));
    }
    let key = CellId(parse_u32(parts[0], text)?);
    let (rows, cols) = parse_pair(parts[1], text)?;
    let (row, col) = parse_pair(parts[2], text)?;
    let offset = parse_usize(parts[3], text)?;
    Ok(CellRef {
        key,
        shape: Shape { rows, cols },
        strides: Strides { row, col },
        offset,
    })
}

/// Numeric type tag identifying an operator kind on the wire.
pub fn op_type_tag(op: &Operator) -> u8 {
    match op {
        Operator::Reset { .. } => 0,
        Operator::Copy { .. } => 1,
        Operator::DotInc { .. } => 2,
        Operator::ElementwiseInc { .. } => 3,
        Operator::Lif { .. } => 4,
        Operator::LifRate { .. } => 5,
        Operator::AdaptiveLif { .. } => 6,
        Operator::AdaptiveLifRate { .. } => 7,
        Operator::RectifiedLinear { .. } => 8,
        Operator::Sigmoid { .. } => 9,
        Operator::Izhikevich { .. } => 10,
        Operator::NoDenSynapse { .. } => 11,
        Operator::SimpleSynapse { .. } => 12,
        Operator::Synapse { .. } => 13,
        Operator::Send { .. } => 14,
        Operator::Recv { .. } => 15,
        Operator::Wait { .. } => 16,
    }
}

/// Encode an operator as a self-describing field-delimited record. The first
/// field is the numeric type tag; the rest are the operator's resolved
/// parameters, with every cell rendered through [`encode_cell_ref`].
/// Placeholders carry bare cell keys; the runtime resolves them by identity.
pub fn encode_operator(op: &Operator) -> String {
    let mut fields: Vec<String> = vec![op_type_tag(op).to_string()];

    match op {
        Operator::Reset { dst, value } => {
            fields.push(encode_cell_ref(dst));
            fields.push(value.to_string());
        }
        Operator::Copy { dst, src } => {
            fields.push(encode_cell_ref(dst));
            fields.push(encode_cell_ref(src));
        }
        Operator::DotInc { a, x, y } | Operator::ElementwiseInc { a, x, y } => {
            fields.push(encode_cell_ref(a));
            fields.push(encode_cell_ref(x));
            fields.push(encode_cell_ref(y));
        }
        Operator::Lif {
            n_units,
            tau_rc,
            tau_ref,
            min_voltage,
            j,
            output,
            voltage,
            ref_time,
        } => {
            fields.push(n_units.to_string());
            fields.push(tau_rc.to_string());
            fields.push(tau_ref.to_string());
            fields.push(min_voltage.to_string());
            fields.push(encode_cell_ref(j));
            fields.push(encode_cell_ref(output));
            fields.push(encode_cell_ref(voltage));
            fields.push(encode_cell_ref(ref_time));
        }
        Operator::LifRate {
            n_units,
            tau_rc,
            tau_ref,
            j,
            output,
        } => {
            fields.push(n_units.to_string());
            fields.push(tau_rc.to_string());
            fields.push(tau_ref.to_string());
            fields.push(encode_cell_ref(j));
            fields.push(encode_cell_ref(output));
        }
        Operator::AdaptiveLif {
            n_units,
            tau_n,
            inc_n,
            tau_rc,
            tau_ref,
            min_voltage,
            j,
            output,
            voltage,
            ref_time,
            adaptation,
        } => {
            fields.push(n_units.to_string());
            fields.push(tau_n.to_string());
            fields.push(inc_n.to_string());
            fields.push(tau_rc.to_string());
            fields.push(tau_ref.to_string());
            fields.push(min_voltage.to_string());
            fields.push(encode_cell_ref(j));
            fields.push(encode_cell_ref(output));
            fields.push(encode_cell_ref(voltage));
            fields.push(encode_cell_ref(ref_time));
            fields.push(encode_cell_ref(adaptation));
        }
        Operator::AdaptiveLifRate {
            n_units,
            tau_n,
            inc_n,
            tau_rc,
            tau_ref,
            j,
            output,
            adaptation,
        } => {
            fields.push(n_units.to_string());
            fields.push(tau_n.to_string());
            fields.push(inc_n.to_string());
            fields.push(tau_rc.to_string());
            fields.push(tau_ref.to_string());
            fields.push(encode_cell_ref(j));
            fields.push(encode_cell_ref(output));
            fields.push(encode_cell_ref(adaptation));
        }
        Operator::RectifiedLinear { n_units, j, output } => {
            fields.push(n_units.to_string());
            fields.push(encode_cell_ref(j));
            fields.push(encode_cell_ref(output));
        }
        Operator::Sigmoid {
            n_units,
            tau_ref,
            j,
            output,
        } => {
            fields.push(n_units.to_string());
            fields.push(tau_ref.to_string());
            fields.push(encode_cell_ref(j));
            fields.push(encode_cell_ref(output));
        }
        Operator::Izhikevich {
            n_units,
            tau_recovery,
            coupling,
            reset_voltage,
            reset_recovery,
            j,
            output,
            voltage,
            recovery,
        } => {
            fields.push(n_units.to_string());
            fields.push(tau_recovery.to_string());
            fields.push(coupling.to_string());
            fields.push(reset_voltage.to_string());
            fields.push(reset_recovery.to_string());
            fields.push(encode_cell_ref(j));
            fields.push(encode_cell_ref(output));
            fields.push(encode_cell_ref(voltage));
            fields.push(encode_cell_ref(recovery));
        }
        Operator::NoDenSynapse { input, output, b } => {
            fields.push(encode_cell_ref(input));
            fields.push(encode_cell_ref(output));
            fields.push(b.to_string());
        }
        Operator::SimpleSynapse {
            input,
            output,
            a,
            b,
        } => {
            fields.push(encode_cell_ref(input));
            fields.push(encode_cell_ref(output));
            fields.push(a.to_string());
            fields.push(b.to_string());
        }
        Operator::Synapse {
            input,
            output,
            num,
            den,
        } => {
            fields.push(encode_cell_ref(input));
            fields.push(encode_cell_ref(output));
            fields.push(join_floats(num));
            fields.push(join_floats(den));
        }
        Operator::Send { dst, tag, cell } => {
            fields.push(dst.to_string());
            fields.push(tag.to_string());
            fields.push(cell.key.key().to_string());
        }
        Operator::Recv { src, tag, cell } => {
            fields.push(src.to_string());
            fields.push(tag.to_string());
            fields.push(cell.key.key().to_string());
        }
        Operator::Wait { cell } => {
            fields.push(cell.key.key().to_string());
        }
    }

    fields.join(&OP_DELIM.to_string())
}

/// Decode an operator record produced by [`encode_operator`]. Re-encoding
/// the result yields the identical record string.
pub fn decode_operator(record: &str) -> Result<Operator> {
    let fields: Vec<&str> = record.split(OP_DELIM).collect();
    let tag = parse_u32(fields[0], record)? as u8;
    let args = &fields[1..];

    let arity = |n: usize| -> Result<()> {
        if args.len() == n {
            Ok(())
        } else {
            Err(invalid(record, "wrong field count"))
        }
    };

    let op = match tag {
        0 => {
            arity(2)?;
            Operator::Reset {
                dst: decode_cell_ref(args[0])?,
                value: parse_f64(args[1], record)?,
            }
        }
        1 => {
            arity(2)?;
            Operator::Copy {
                dst: decode_cell_ref(args[0])?,
                src: decode_cell_ref(args[1])?,
            }
        }
        2 => {
            arity(3)?;
            Operator::DotInc {
                a: decode_cell_ref(args[0])?,
                x: decode_cell_ref(args[1])?,
                y: decode_cell_ref(args[2])?,
            }
        }
        3 => {
            arity(3)?;
            Operator::ElementwiseInc {
                a: decode_cell_ref(args[0])?,
                x: decode_cell_ref(args[1])?,
                y: decode_cell_ref(args[2])?,
            }
        }
        4 => {
            arity(8)?;
            Operator::Lif {
                n_units: parse_usize(args[0], record)?,
                tau_rc: parse_f64(args[1], record)?,
                tau_ref: parse_f64(args[2], record)?,
                min_voltage: parse_f64(args[3], record)?,
                j: decode_cell_ref(args[4])?,
                output: decode_cell_ref(args[5])?,
                voltage: decode_cell_ref(args[6])?,
                ref_time: decode_cell_ref(args[7])?,
            }
        }
        5 => {
            arity(5)?;
            Operator::LifRate {
                n_units: parse_usize(args[0], record)?,
                tau_rc: parse_f64(args[1], record)?,
                tau_ref: parse_f64(args[2], record)?,
                j: decode_cell_ref(args[3])?,
                output: decode_cell_ref(args[4])?,
            }
        }
        6 => {
            arity(11)?;
            Operator::AdaptiveLif {
                n_units: parse_usize(args[0], record)?,
                tau_n: parse_f64(args[1], record)?,
                inc_n: parse_f64(args[2], record)?,
                tau_rc: parse_f64(args[3], record)?,
                tau_ref: parse_f64(args[4], record)?,
                min_voltage: parse_f64(args[5], record)?,
                j: decode_cell_ref(args[6])?,
                output: decode_cell_ref(args[7])?,
                voltage: decode_cell_ref(args[8])?,
                ref_time: decode_cell_ref(args[9])?,
                adaptation: decode_cell_ref(args[10])?,
            }
        }
        7 => {
            arity(8)?;
            Operator::AdaptiveLifRate {
                n_units: parse_usize(args[0], record)?,
                tau_n: parse_f64(args[1], record)?,
                inc_n: parse_f64(args[2], record)?,
                tau_rc: parse_f64(args[3], record)?,
                tau_ref: parse_f64(args[4], record)?,
                j: decode_cell_ref(args[5])?,
                output: decode_cell_ref(args[6])?,
                adaptation: decode_cell_ref(args[7])?,
            }
        }
        8 => {
            arity(3)?;
            Operator::RectifiedLinear {
                n_units: parse_usize(args[0], record)?,
                j: decode_cell_ref(args[1])?,
                output: decode_cell_ref(args[2])?,
            }
        }
        9 => {
            arity(4)?;
            Operator::Sigmoid {
                n_units: parse_usize(args[0], record)?,
                tau_ref: parse_f64(args[1], record)?,
                j: decode_cell_ref(args[2])?,
                output: decode_cell_ref(args[3])?,
            }
        }
        10 => {
            arity(9)?;
            Operator::Izhikevich {
                n_units: parse_usize(args[0], record)?,
                tau_recovery: parse_f64(args[1], record)?,
                coupling: parse_f64(args[2], record)?,
                reset_voltage: parse_f64(args[3], record)?,
                reset_recovery: parse_f64(args[4], record)?,
                j: decode_cell_ref(args[5])?,
                output: decode_cell_ref(args[6])?,
                voltage: decode_cell_ref(args[7])?,
                recovery: decode_cell_ref(args[8])?,
            }
        }
        11 => {
            arity(3)?;
            Operator::NoDenSynapse {
                input: decode_cell_ref(args[0])?,
                output: decode_cell_ref(args[1])?,
                b: parse_f64(args[2], record)?,
            }
        }
        12 => {
            arity(4)?;
            Operator::SimpleSynapse {
                input: decode_cell_ref(args[0])?,
                output: decode_cell_ref(args[1])?,
                a: parse_f64(args[2], record)?,
                b: parse_f64(args[3], record)?,
            }
        }
        13 => {
            arity(4)?;
            Operator::Synapse {
                input: decode_cell_ref(args[0])?,
                output: decode_cell_ref(args[1])?,
                num: split_floats(args[2], record)?,
                den: split_floats(args[3], record)?,
            }
        }
        14 => {
            arity(3)?;
            Operator::Send {
                dst: parse_usize(args[0], record)?,
                tag: parse_u32(args[1], record)?,
                cell: CellRef::key_only(CellId(parse_u32(args[2], record)?)),
            }
        }
        15 => {
            arity(3)?;
            Operator::Recv {
                src: parse_usize(args[0], record)?,
                tag: parse_u32(args[1], record)?,
                cell: CellRef::key_only(CellId(parse_u32(args[2], record)?)),
            }
        }
        16 => {
            arity(1)?;
            Operator::Wait {
                cell: CellRef::key_only(CellId(parse_u32(args[0], record)?)),
            }
        }
        other => {
            return Err(invalid(record, &format!("unknown operator tag {other}")));
        }
    };
    Ok(op)
}

/// Probe record: `component|probe_key|cell_reference|period|label`.
pub fn encode_probe(
    component: usize,
    probe_key: u64,
    target: &CellRef,
    period: u64,
    label: &str,
) -> String {
    [
        component.to_string(),
        probe_key.to_string(),
        encode_cell_ref(target),
        period.to_string(),
        sanitize_label(label),
    ]
    .join(&PROBE_DELIM.to_string())
}

fn join_floats(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn split_floats(field: &str, record: &str) -> Result<Vec<f64>> {
    if field.is_empty() {
        return Ok(Vec::new());
    }
    field.split(',').map(|v| parse_f64(v, record)).collect()
}

fn parse_pair(field: &str, record: &str) -> Result<(usize, usize)> {
    match field.split_once(',') {
        Some((a, b)) => Ok((parse_usize(a, record)?, parse_usize(b, record)?)),
        None => Err(invalid(record, "expected a comma-separated pair")),
    }
}

fn parse_f64(field: &str, record: &str) -> Result<f64> {
    field
        .parse()
        .map_err(|_| invalid(record, &format!("bad float '{field}'")))
}

fn parse_usize(field: &str, record: &str) -> Result<usize> {
    field
        .parse()
        .map_err(|_| invalid(record, &format!("bad integer '{field}'")))
}

fn parse_u32(field: &str, record: &str) -> Result<u32> {
    field
        .parse()
        .map_err(|_| invalid(record, &format!("bad integer '{field}'")))
}

fn invalid(record: &str, reason: &str) -> CompileError {
    CompileError::InvalidRecord(format!("{reason} in '{record}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitbrain_core::cell::{CellArena, Shape};

    fn reg(arena: &mut CellArena, label: &str, shape: Shape) -> CellRef {
        let id = arena.register(label, shape);
        arena.full_ref(id)
    }

    #[test]
    fn cell_ref_encoding_has_three_level_delimiters() {
        let mut arena = CellArena::new();
        let cell = reg(&mut arena, "weights", Shape::matrix(3, 2));
        assert_eq!(encode_cell_ref(&cell), "0:3,2:2,1:0");

        let view = arena.view(cell.key, Shape::vector(2), Strides { row: 1, col: 1 }, 2);
        assert_eq!(encode_cell_ref(&view), "0:2,1:1,1:2");
    }

    #[test]
    fn cell_ref_round_trips() {
        let text = "7:4,1:1,1:3";
        let decoded = decode_cell_ref(text).unwrap();
        assert_eq!(encode_cell_ref(&decoded), text);
    }

    #[test]
    fn every_operator_kind_round_trips() {
        let mut arena = CellArena::new();
        let a = reg(&mut arena, "a", Shape::matrix(2, 2));
        let x = reg(&mut arena, "x", Shape::vector(2));
        let y = reg(&mut arena, "y", Shape::vector(2));
        let s = reg(&mut arena, "s", Shape::vector(2));
        let t = reg(&mut arena, "t", Shape::vector(2));

        let ops = vec![
            Operator::Reset { dst: y, value: 0.5 },
            Operator::Copy { dst: y, src: x },
            Operator::DotInc { a, x, y },
            Operator::ElementwiseInc { a, x, y },
            Operator::Lif {
                n_units: 2,
                tau_rc: 0.02,
                tau_ref: 0.002,
                min_voltage: 0.0,
                j: x,
                output: y,
                voltage: s,
                ref_time: t,
            },
            Operator::LifRate {
                n_units: 2,
                tau_rc: 0.02,
                tau_ref: 0.002,
                j: x,
                output: y,
            },
            Operator::AdaptiveLif {
                n_units: 2,
                tau_n: 1.0,
                inc_n: 0.01,
                tau_rc: 0.02,
                tau_ref: 0.002,
                min_voltage: 0.0,
                j: x,
                output: y,
                voltage: s,
                ref_time: t,
                adaptation: a,
            },
            Operator::AdaptiveLifRate {
                n_units: 2,
                tau_n: 1.0,
                inc_n: 0.01,
                tau_rc: 0.02,
                tau_ref: 0.002,
                j: x,
                output: y,
                adaptation: s,
            },
            Operator::RectifiedLinear {
                n_units: 2,
                j: x,
                output: y,
            },
            Operator::Sigmoid {
                n_units: 2,
                tau_ref: 0.0025,
                j: x,
                output: y,
            },
            Operator::Izhikevich {
                n_units: 2,
                tau_recovery: 0.02,
                coupling: 0.2,
                reset_voltage: -65.0,
                reset_recovery: 8.0,
                j: x,
                output: y,
                voltage: s,
                recovery: t,
            },
            Operator::NoDenSynapse {
                input: x,
                output: y,
                b: 1.0,
            },
            Operator::SimpleSynapse {
                input: x,
                output: y,
                a: -0.9048,
                b: 0.0952,
            },
            Operator::Synapse {
                input: x,
                output: y,
                num: vec![0.1, 0.2],
                den: vec![-0.9],
            },
            Operator::Send {
                dst: 3,
                tag: 12,
                cell: CellRef::key_only(CellId(5)),
            },
            Operator::Recv {
                src: 0,
                tag: 12,
                cell: CellRef::key_only(CellId(5)),
            },
            Operator::Wait {
                cell: CellRef::key_only(CellId(5)),
            },
        ];

        for op in &ops {
            let record = encode_operator(op);
            let decoded = decode_operator(&record).unwrap();
            assert_eq!(
                encode_operator(&decoded),
                record,
                "round-trip mismatch for {}",
                op.kind()
            );
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = decode_operator("99;1:1,1:1,1:0").unwrap_err();
        assert!(matches!(err, CompileError::InvalidRecord(_)));
    }

    #[test]
    fn labels_never_collide_with_delimiters() {
        let sanitized = sanitize_label("probe (spikes); v:1|x");
        assert!(!sanitized.contains(' '));
        assert!(!sanitized.contains('('));
        assert!(!sanitized.contains(OP_DELIM));
        assert!(!sanitized.contains(CELL_DELIM));
        assert!(!sanitized.contains(PROBE_DELIM));
        assert_eq!(sanitized, "probespikes_v_1_x");
    }

    #[test]
    fn probe_record_layout() {
        let mut arena = CellArena::new();
        let cell = reg(&mut arena, "out", Shape::vector(4));
        let record = encode_probe(2, 7, &cell, 10, "spike probe");
        assert_eq!(record, "2|7|0:4,1:1,1:0|10|spikeprobe");
    }
}
