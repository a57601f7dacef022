use lantern::device::{self, IoDevice};
use lantern::interpreter::Interpreter;
use lantern::memory::Memory;
use lantern::terminal::TerminalDevice;
use lantern::vm::VM;
use log::{debug, info};
use std::fs::File;
use std::io::Read;
use std::process::ExitCode;

fn usage(program: &str) -> ExitCode {
    eprintln!("usage: {program} <story-file> [--trace]");
    ExitCode::from(1)
}

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "lantern".to_string());
    let mut story_path = None;
    let mut trace = false;
    for arg in args {
        match arg.as_str() {
            "--trace" => trace = true,
            _ if story_path.is_none() => story_path = Some(arg),
            _ => return usage(&program),
        }
    }
    let story_path = match story_path {
        Some(path) => path,
        None => return usage(&program),
    };

    let mut bytes = Vec::new();
    if let Err(e) = File::open(&story_path).and_then(|mut f| f.read_to_end(&mut bytes)) {
        eprintln!("{program}: cannot read {story_path}: {e}");
        return ExitCode::from(1);
    }

    let vm = match Memory::load(bytes).and_then(VM::new) {
        Ok(vm) => vm,
        Err(e) => {
            eprintln!("{program}: {story_path}: {e}");
            return ExitCode::from(1);
        }
    };
    info!("loaded {story_path} ({} bytes)", vm.memory.len());
    debug!("story header: {}", vm.header);

    let trace = device::trace_handle(trace);
    let mut dev = TerminalDevice::new(trace.clone());

    let result = {
        let mut interp = Interpreter::new(vm, &mut dev);
        interp.set_trace_handle(trace);
        interp.run()
    };

    let code: u8 = match result {
        Ok(()) => 0,
        Err(e) => {
            let _ = dev.write_string("\n");
            let _ = dev.write_error(&format!("fatal: {e}"));
            1
        }
    };
    let _ = dev.close();
    ExitCode::from(code)
}
