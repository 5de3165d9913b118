use std::io::Read;
use std::process;

use serde::Serialize;
use vcs_elf_bridge::debug_flags;
use vcs_elf_bridge::{
    BusStuffMasks, BusTransaction, BusTransactionQueue, GuestCore, GuestFault, Intrinsic,
    StubError, TransactionKind, VcsLib,
};

// Headless stub replay.
// Usage:
//   cargo run --bin stub_trace -- [--json] [--save-state out.state] script.txt
// Script lines are `symbol arg0 arg1 ...` (args land in r0, r1, ...), or
// `masks a x y` to preload the bus-stuff masks. `#` starts a comment.

const GUEST_RAM_SIZE: usize = 0x10000;
const TARGET_SPACE: usize = 0x2000;
const MAX_RETRIES: u32 = 64;

fn parse_u32_hex_or_dec(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Some(stripped) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(stripped, 16).ok()
    } else {
        s.parse::<u32>().ok()
    }
}

struct Options {
    json: bool,
    save_state: Option<String>,
    script: String,
}

fn parse_args() -> Result<Options, String> {
    let mut args = std::env::args().skip(1);
    let mut json = false;
    let mut save_state = None;
    let mut script = None;

    while let Some(a) = args.next() {
        match a.as_str() {
            "--json" => json = true,
            "--save-state" => {
                save_state = Some(args.next().ok_or("--save-state requires a value")?);
            }
            s if s.starts_with("--") => return Err(format!("Unknown option: {}", s)),
            s => script = Some(s.to_string()),
        }
    }

    Ok(Options {
        json,
        save_state,
        script: script.ok_or("script argument missing (use - for stdin)")?,
    })
}

/// Flat guest RAM at address 0.
struct ScriptCore {
    registers: [u32; 16],
    cycles: u64,
    ram: Vec<u8>,
}

impl GuestCore for ScriptCore {
    type Op = u16;

    fn register(&self, index: usize) -> u32 {
        self.registers[index]
    }

    fn set_register(&mut self, index: usize, value: u32) {
        self.registers[index] = value;
    }

    fn cycles(&self) -> u64 {
        self.cycles
    }

    fn decode_instruction_word(&self, word: u16) -> u16 {
        word
    }

    fn write8(&mut self, addr: u32, value: u8) -> Result<(), GuestFault> {
        let slot = self
            .ram
            .get_mut(addr as usize)
            .ok_or(GuestFault { address: addr, width: 1 })?;
        *slot = value;
        Ok(())
    }
}

/// Minimal 6507 stand-in. Injected code is stored, not executed; every yield
/// reports its address and the byte currently held there.
struct ToyTarget {
    space: Vec<u8>,
}

impl ToyTarget {
    fn run(&mut self, queue: &mut BusTransactionQueue, lib: &mut VcsLib) -> Vec<BusTransaction> {
        let mut played = Vec::new();
        while let Some(transaction) = queue.pop() {
            let slot = transaction.address as usize % TARGET_SPACE;
            match transaction.kind {
                TransactionKind::Inject { value } | TransactionKind::Stuff { value } => {
                    self.space[slot] = value;
                }
                TransactionKind::Yield => lib.update_bus(transaction.address, self.space[slot]),
            }
            played.push(transaction);
        }
        played
    }
}

#[derive(Serialize)]
struct CallRecord {
    line: usize,
    call: String,
    r0: u32,
    retries: u32,
    transactions: Vec<BusTransaction>,
}

fn run_script(source: &str, lib: &mut VcsLib) -> Result<Vec<CallRecord>, String> {
    let mut core = ScriptCore {
        registers: [0; 16],
        cycles: 0,
        ram: vec![0; GUEST_RAM_SIZE],
    };
    let mut queue = BusTransactionQueue::new();
    let mut target = ToyTarget {
        space: vec![0; TARGET_SPACE],
    };
    let mut records = Vec::new();

    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let text = raw.split('#').next().unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }

        let mut words = text.split_whitespace();
        let head = words.next().unwrap_or_default();
        let args = words
            .map(|w| parse_u32_hex_or_dec(w).ok_or(format!("line {}: bad number '{}'", line, w)))
            .collect::<Result<Vec<_>, _>>()?;

        if head == "masks" {
            let &[a, x, y] = args.as_slice() else {
                return Err(format!("line {}: masks takes three values", line));
            };
            lib.set_stuff_masks(BusStuffMasks {
                a: a as u8,
                x: x as u8,
                y: y as u8,
            });
            continue;
        }

        let intrinsic = Intrinsic::from_symbol(head)
            .ok_or(format!("line {}: unknown stub '{}'", line, head))?;
        if args.len() > core.registers.len() {
            return Err(format!("line {}: too many arguments", line));
        }
        core.registers[..args.len()].copy_from_slice(&args);

        let mut transactions = Vec::new();
        let mut retries = 0;
        loop {
            core.cycles += 1;
            match lib.fetch16(intrinsic.address(), &mut core, &mut queue) {
                Ok(_) => break,
                Err(e) if e.is_retryable() && retries < MAX_RETRIES => {
                    retries += 1;
                    transactions.extend(target.run(&mut queue, lib));
                }
                Err(StubError::Unimplemented(i)) => {
                    return Err(format!("line {}: fatal: unimplemented: {}", line, i));
                }
                Err(e) => return Err(format!("line {}: {}", line, e)),
            }
        }
        transactions.extend(target.run(&mut queue, lib));

        records.push(CallRecord {
            line,
            call: text.to_string(),
            r0: core.registers[0],
            retries,
            transactions,
        });
    }

    Ok(records)
}

fn print_text(records: &[CallRecord]) {
    for record in records {
        println!(
            "{:>4}: {}  (r0=0x{:08X}, retries={})",
            record.line, record.call, record.r0, record.retries
        );
        for t in &record.transactions {
            let what = match t.kind {
                TransactionKind::Inject { value } => format!("inject {:02X}", value),
                TransactionKind::Yield => "yield".to_string(),
                TransactionKind::Stuff { value } => format!("stuff  {:02X}", value),
            };
            println!("      [t={:>6}] ${:04X} {}", t.timestamp, t.address, what);
        }
    }
}

fn main() {
    env_logger::init();

    let options = match parse_args() {
        Ok(o) => o,
        Err(msg) => {
            eprintln!("{}", msg);
            process::exit(2);
        }
    };

    let source = if options.script == "-" {
        let mut buf = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
            eprintln!("Failed to read stdin: {}", e);
            process::exit(1);
        }
        buf
    } else {
        match std::fs::read_to_string(&options.script) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Failed to read {}: {}", options.script, e);
                process::exit(1);
            }
        }
    };

    let mut lib = VcsLib::new();
    let records = match run_script(&source, &mut lib) {
        Ok(r) => r,
        Err(msg) => {
            eprintln!("{}", msg);
            process::exit(1);
        }
    };

    if options.json {
        match serde_json::to_string_pretty(&records) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to encode trace: {}", e);
                process::exit(1);
            }
        }
    } else {
        print_text(&records);
        if !debug_flags::quiet() {
            println!("{} call(s) replayed", records.len());
        }
    }

    if let Some(path) = options.save_state {
        if let Err(e) = lib.save_state().save_to_file(&path) {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}
