//! packed-alu: evaluate packed sub-word vector ALU instructions

use std::env;

use anyhow::{bail, Context};
use packed_alu::alu::catalog::{ClampKind, Container};
use packed_alu::alu::{
    AccumWindow, Executor, Instruction, Modifiers, Opcode, Operand, PackedExecutor, WaveContext,
};
use packed_alu::config::Config;

/// First register of source operand `i`; pairs need two, so space by two.
const SRC_BASE: [u16; 3] = [0, 2, 4];
const DEST: u16 = 8;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("catalog") => {
            print_catalog();
            Ok(())
        }
        Some("eval") => run_eval(&args[2..]),
        Some("config") => print_config(),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("packed-alu: evaluate packed sub-word vector ALU instructions");
    println!();
    println!("Usage:");
    println!("  packed-alu catalog");
    println!("  packed-alu eval <mnemonic> [--clamp] [--opsel N] [--opsel-hi N]");
    println!("                  [--neg N] [--neg-hi N] <src0> [<src1> [<src2>]]");
    println!("  packed-alu config");
    println!();
    println!("Operands are hex (0x...) or decimal. Set RUST_LOG=debug for tracing.");
}

fn print_catalog() {
    println!("{:<6} {:<18} {:>5} {:>5} {:>4} {:>6}", "raw", "mnemonic", "srcs", "field", "reg", "clamp");
    println!("{}", "-".repeat(49));
    for op in Opcode::all() {
        let d = op.descriptor();
        let clamp = match d.clamp {
            ClampKind::Int => "int",
            ClampKind::Unit => "unit",
            ClampKind::None => "-",
        };
        println!(
            "0x{:02X}   {:<18} {:>5} {:>5} {:>4} {:>6}",
            op.raw(),
            op.mnemonic(),
            d.arity,
            d.field_width.bits(),
            d.container.bits(),
            clamp
        );
    }
}

fn print_config() -> anyhow::Result<()> {
    let config = Config::get();
    println!("Effective configuration");
    println!("=======================");
    println!("wave_size:    {}", config.wave_size());
    println!("vgprs:        {}", config.vgprs());
    println!("accum_offset: {}", config.accum_offset());
    println!("rounding:     {:?}", config.rounding_mode()?);
    if let Some(path) = Config::user_config_path() {
        println!("user config:  {}", path.display());
    }
    config.validate().context("configuration is invalid")?;
    println!();
    println!("Sample config file:");
    println!("-------------------");
    print!("{}", Config::sample_config());
    Ok(())
}

fn parse_number(s: &str) -> anyhow::Result<u64> {
    let v = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(&hex.replace('_', ""), 16)
    } else {
        s.replace('_', "").parse()
    };
    v.with_context(|| format!("invalid number: {}", s))
}

fn parse_mask(s: Option<&String>, flag: &str) -> anyhow::Result<u8> {
    let Some(s) = s else {
        bail!("{} needs a value", flag);
    };
    let v = parse_number(s)?;
    if v > 0b111 {
        bail!("{} takes a 3-bit mask, got {}", flag, s);
    }
    Ok(v as u8)
}

fn run_eval(args: &[String]) -> anyhow::Result<()> {
    let Some(name) = args.first() else {
        bail!("eval needs a mnemonic; try `packed-alu catalog`");
    };
    let opcode = Opcode::from_mnemonic(name)?;
    let desc = opcode.descriptor();

    let mut mods = Modifiers::default();
    let mut values = Vec::new();
    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--clamp" => mods.clamp = true,
            "--opsel" => mods.opsel = parse_mask(iter.next(), "--opsel")?,
            "--opsel-hi" => mods.opsel_hi = parse_mask(iter.next(), "--opsel-hi")?,
            "--neg" => mods.neg = parse_mask(iter.next(), "--neg")?,
            "--neg-hi" => mods.neg_hi = parse_mask(iter.next(), "--neg-hi")?,
            flag if flag.starts_with("--") => bail!("unknown option: {}", flag),
            value => values.push(parse_number(value)?),
        }
    }

    if values.len() != desc.arity {
        bail!("{} takes {} operand(s), got {}", opcode, desc.arity, values.len());
    }

    let config = Config::get();
    config.validate().context("configuration is invalid")?;
    let window = AccumWindow::new(config.accum_offset());
    let mut ctx = WaveContext::new(1, config.vgprs()).with_accum(window);

    let mut inst = Instruction::new(opcode)
        .with_dest(Operand::Vgpr(DEST))
        .with_modifiers(mods);
    for (i, &value) in values.iter().enumerate() {
        // Accumulator reads take their input from the accumulator half.
        let reg = if opcode == Opcode::AccvgprRead {
            window.resolve(SRC_BASE[i] as u32)
        } else {
            SRC_BASE[i] as u32
        };
        match desc.container {
            Container::B32 => ctx.vgprs.write_lane(reg, 0, value as u32)?,
            Container::B64 => ctx.vgprs.write_value(reg, 0, value)?,
        }
        inst = inst.with_source(Operand::Vgpr(SRC_BASE[i]));
    }

    let executor = PackedExecutor::new().with_rounding(config.rounding_mode()?);
    let outcome = executor.execute(&inst, &mut ctx)?;

    let dest = if opcode == Opcode::AccvgprWrite {
        window.resolve(DEST as u32)
    } else {
        DEST as u32
    };
    match desc.container {
        Container::B32 => println!("{} = 0x{:08X}", opcode, ctx.vgprs.read_lane(dest, 0)?),
        Container::B64 => println!(
            "{} = 0x{:016X}",
            opcode,
            ctx.vgprs.read_value::<u64>(dest, 0)?
        ),
    }
    for w in &outcome.warnings {
        println!("warning: {}", w);
    }
    if outcome.fp_flags.any() {
        println!("fp flags: {}", outcome.fp_flags);
    }
    Ok(())
}
