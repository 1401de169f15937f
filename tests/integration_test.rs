//! Integration tests for the Jack compiler.
//!
//! Compiles complete programs modelled on the nand2tetris project 11 test
//! suite, checks the generated VM code, and drives the directory compiler
//! and file writer against a temporary directory.

use jack_compiler::{
    CompileError, CompileOptions, compile_directory, compile_directory_with_options,
    compile_file, compile_source, compile_source_with_options, write_result,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

/// Compile a source and return its VM code, failing the test on error.
fn compile_ok(source: &str, name: &str) -> String {
    let result = compile_source(source, name);
    assert!(
        result.is_ok(),
        "Compilation of {} failed:\n{}",
        name,
        result.diagnostic().unwrap_or_default()
    );
    result.vm_code
}

/// Check that every pattern occurs in the output, in the given order.
fn assert_in_order(vm: &str, patterns: &[&str]) {
    let mut rest = vm;
    for pattern in patterns {
        let pos = rest
            .find(pattern)
            .unwrap_or_else(|| panic!("'{}' not found in order in:\n{}", pattern, vm));
        rest = &rest[pos + pattern.len()..];
    }
}

fn write_sources(dir: &Path, files: &[(&str, &str)]) {
    for (name, source) in files {
        fs::write(dir.join(format!("{}.jack", name)), source).unwrap();
    }
}

// =============================================================================
// Test programs
// =============================================================================

const SEVEN: &str = r#"
// Computes 1 + (2 * 3) and prints the result.
class Main {
    function void main() {
        do Output.printInt(1 + (2 * 3));
        return;
    }
}
"#;

const CONVERT_TO_BIN: &str = r#"
class Main {
    function void main() {
        var int value;
        do Main.fillMemory(8001, 16, -1);
        let value = Memory.peek(8000);
        do Main.convert(value);
        return;
    }

    function void convert(int value) {
        var int mask, position;
        var boolean loop;

        let loop = true;
        while (loop) {
            let position = position + 1;
            let mask = Main.nextMask(mask);

            if (~(position > 16)) {
                if (~((value & mask) = 0)) {
                    do Memory.poke(8000 + position, 1);
                } else {
                    do Memory.poke(8000 + position, 0);
                }
            } else {
                let loop = false;
            }
        }
        return;
    }

    function int nextMask(int mask) {
        if (mask = 0) {
            return 1;
        } else {
            return mask * 2;
        }
    }

    function void fillMemory(int startAddress, int length, int value) {
        while (length > 0) {
            do Memory.poke(startAddress, value);
            let length = length - 1;
            let startAddress = startAddress + 1;
        }
        return;
    }
}
"#;

const SQUARE: &str = r#"
/** A graphical square. */
class Square {
    field int x, y;
    field int size;

    constructor Square new(int Ax, int Ay, int Asize) {
        let x = Ax;
        let y = Ay;
        let size = Asize;
        do draw();
        return this;
    }

    method void dispose() {
        do Memory.deAlloc(this);
        return;
    }

    method void draw() {
        do Screen.setColor(true);
        do Screen.drawRectangle(x, y, x + size, y + size);
        return;
    }

    method void incSize() {
        if (((y + size) < 254) & ((x + size) < 510)) {
            do erase();
            let size = size + 2;
            do draw();
        }
        return;
    }

    method void erase() {
        do Screen.setColor(false);
        do Screen.drawRectangle(x, y, x + size, y + size);
        return;
    }
}
"#;

const SQUARE_GAME: &str = r#"
class SquareGame {
    field Square square;
    field int direction;

    constructor SquareGame new() {
        let square = Square.new(0, 0, 30);
        let direction = 0;
        return this;
    }

    method void dispose() {
        do square.dispose();
        do Memory.deAlloc(this);
        return;
    }

    method void run() {
        var char key;
        var boolean exit;
        let exit = false;

        while (~exit) {
            while (key = 0) {
                let key = Keyboard.keyPressed();
            }
            if (key = 81) { let exit = true; }
            if (key = 90) { do square.incSize(); }
            while (~(key = 0)) {
                let key = Keyboard.keyPressed();
            }
        }
        return;
    }
}
"#;

const SQUARE_MAIN: &str = r#"
class Main {
    function void main() {
        var SquareGame game;
        let game = SquareGame.new();
        do game.run();
        do game.dispose();
        return;
    }
}
"#;

const AVERAGE: &str = r#"
class Main {
    function void main() {
        var Array a;
        var int length;
        var int i, sum;

        let length = Keyboard.readInt("How many numbers? ");
        let a = Array.new(length);
        let i = 0;
        while (i < length) {
            let a[i] = Keyboard.readInt("Enter a number: ");
            let sum = sum + a[i];
            let i = i + 1;
        }
        do Output.printString("The average is ");
        do Output.printInt(sum / length);
        return;
    }
}
"#;

// =============================================================================
// Test 1: Seven - exact listing
// =============================================================================

#[test]
fn test_seven() {
    let vm = compile_ok(SEVEN, "Main");
    let expected = "\
function Main.main 0
push constant 1
push constant 2
push constant 3
call Math.multiply 2
add
call Output.printInt 1
pop temp 0
push constant 0
return
";
    assert_eq!(vm, expected);
}

// =============================================================================
// Test 2: ConvertToBin - procedural features
// =============================================================================

#[test]
fn test_convert_to_bin() {
    let vm = compile_ok(CONVERT_TO_BIN, "Main");

    for function in [
        "function Main.main 1",
        "function Main.convert 3",
        "function Main.nextMask 0",
        "function Main.fillMemory 0",
    ] {
        assert!(vm.contains(function), "missing {}", function);
    }

    // -1 is unary minus applied to 1
    assert!(vm.contains("push constant 16\npush constant 1\nneg\ncall Main.fillMemory 3\n"));
    assert!(vm.contains("call Memory.peek 1\npop local 0\n"));
}

#[test]
fn test_convert_to_bin_while_loop_structure() {
    let vm = compile_ok(CONVERT_TO_BIN, "Main");
    let convert = &vm[vm.find("function Main.convert").unwrap()..vm.find("function Main.nextMask").unwrap()];

    assert_in_order(
        convert,
        &[
            "label Main.convert$WHILE_EXP0",
            "push local 2",
            "not",
            "if-goto Main.convert$WHILE_END0",
            "if-goto Main.convert$IF_FALSE0",
            "if-goto Main.convert$IF_FALSE1",
            "goto Main.convert$IF_END1",
            "label Main.convert$IF_FALSE1",
            "label Main.convert$IF_END1",
            "goto Main.convert$IF_END0",
            "label Main.convert$IF_FALSE0",
            "label Main.convert$IF_END0",
            "goto Main.convert$WHILE_EXP0",
            "label Main.convert$WHILE_END0",
        ],
    );
}

#[test]
fn test_return_inside_both_branches() {
    let vm = compile_ok(CONVERT_TO_BIN, "Main");
    let next_mask = &vm[vm.find("function Main.nextMask").unwrap()..vm.find("function Main.fillMemory").unwrap()];
    let expected = "\
function Main.nextMask 0
push argument 0
push constant 0
eq
not
if-goto Main.nextMask$IF_FALSE0
push constant 1
return
goto Main.nextMask$IF_END0
label Main.nextMask$IF_FALSE0
push argument 0
push constant 2
call Math.multiply 2
return
label Main.nextMask$IF_END0
";
    assert_eq!(next_mask, expected);
}

// =============================================================================
// Test 3: Square - objects, constructors, methods, fields
// =============================================================================

#[test]
fn test_square_constructor() {
    let vm = compile_ok(SQUARE, "Square");
    assert_in_order(
        &vm,
        &[
            "function Square.new 0\n",
            "push constant 3\ncall Memory.alloc 1\npop pointer 0\n",
            "push argument 0\npop this 0\n",
            "push argument 1\npop this 1\n",
            "push argument 2\npop this 2\n",
            "push pointer 0\ncall Square.draw 1\npop temp 0\n",
            "push pointer 0\nreturn\n",
        ],
    );
}

#[test]
fn test_square_methods() {
    let vm = compile_ok(SQUARE, "Square");

    // Every method binds its receiver first.
    for method in ["dispose", "draw", "incSize", "erase"] {
        let header = format!("function Square.{} 0\npush argument 0\npop pointer 0\n", method);
        assert!(vm.contains(&header), "missing receiver binding for {}", method);
    }

    // `this` inside a method is the receiver argument.
    assert!(vm.contains("push argument 0\ncall Memory.deAlloc 1\n"));
    assert!(vm.contains("push constant 1\nneg\ncall Screen.setColor 1\n"));
    assert!(vm.contains("push constant 0\ncall Screen.setColor 1\n"));
    assert!(vm.contains("call Screen.drawRectangle 4\n"));
}

#[test]
fn test_square_game_calls_through_fields() {
    let vm = compile_ok(SQUARE_GAME, "SquareGame");

    assert!(vm.contains("push constant 2\ncall Memory.alloc 1\n"));
    assert!(vm.contains("call Square.new 3\npop this 0\n"));
    // Method call on a field: receiver pushed from the this segment.
    assert!(vm.contains("push this 0\ncall Square.dispose 1\npop temp 0\n"));
    assert!(vm.contains("push this 0\ncall Square.incSize 1\npop temp 0\n"));
    assert!(vm.contains("function SquareGame.run 2\n"));
}

#[test]
fn test_square_main_calls_through_locals() {
    let vm = compile_ok(SQUARE_MAIN, "Main");
    let expected = "\
function Main.main 1
call SquareGame.new 0
pop local 0
push local 0
call SquareGame.run 1
pop temp 0
push local 0
call SquareGame.dispose 1
pop temp 0
push constant 0
return
";
    assert_eq!(vm, expected);
}

#[test]
fn test_labels_unique_within_each_class() {
    for (source, name) in [
        (CONVERT_TO_BIN, "Main"),
        (SQUARE, "Square"),
        (SQUARE_GAME, "SquareGame"),
        (AVERAGE, "Main"),
    ] {
        let vm = compile_ok(source, name);
        let mut seen = HashSet::new();
        for line in vm.lines().filter(|l| l.starts_with("label ")) {
            assert!(seen.insert(line), "duplicate {} in {}", line, name);
        }
    }
}

// =============================================================================
// Test 4: Average - arrays and strings
// =============================================================================

#[test]
fn test_average_arrays_and_strings() {
    let vm = compile_ok(AVERAGE, "Main");

    assert!(vm.contains("function Main.main 4\n"));
    assert!(vm.contains("push local 1\ncall Array.new 1\npop local 0\n"));

    // let a[i] = Keyboard.readInt(...)
    assert_in_order(
        &vm,
        &[
            "push local 0\npush local 2\nadd\n",
            "push constant 16\ncall String.new 1\n",
            "call Keyboard.readInt 1\n",
            "pop temp 0\npop pointer 1\npush temp 0\npop that 0\n",
            // let sum = sum + a[i]
            "push local 3\npush local 0\npush local 2\nadd\npop pointer 1\npush that 0\nadd\npop local 3\n",
        ],
    );

    assert!(vm.contains("push local 3\npush local 1\ncall Math.divide 2\ncall Output.printInt 1\n"));
}

// =============================================================================
// Error reporting
// =============================================================================

#[test]
fn test_error_is_located() {
    let source = "class Main {\n    function void main() {\n        let y = 1;\n        return;\n    }\n}\n";
    let result = compile_source(source, "Main");
    assert!(!result.is_ok());
    assert!(result.vm_code.is_empty());

    match &result.error {
        Some(CompileError::UndefinedSymbol { name, span }) => {
            assert_eq!(name, "y");
            assert_eq!(span.line, 3);
            assert_eq!(span.column, 13);
        }
        other => panic!("expected undefined symbol, got {:?}", other),
    }

    let diagnostic = result.diagnostic().unwrap();
    assert!(diagnostic.contains("--> Main:3:13"));
    assert!(diagnostic.contains("            ^"));
}

#[test]
fn test_first_error_aborts_unit() {
    // Two problems; only the first is reported.
    let source = "class Main { function void main() { let a = 1; let b = 2; return; } }";
    let result = compile_source(source, "Main");
    assert!(matches!(
        result.error,
        Some(CompileError::UndefinedSymbol { ref name, .. }) if name == "a"
    ));
}

#[test]
fn test_unterminated_comment() {
    let source = "class Main {\n/* never closed\nfunction void main() { return; }\n}\n";
    let result = compile_source(source, "Main");
    match result.error {
        Some(CompileError::Lexical { span, .. }) => assert_eq!(span.line, 2),
        other => panic!("expected lexical error, got {:?}", other),
    }
}

// =============================================================================
// Directory driver and output files
// =============================================================================

#[test]
fn test_compile_directory() {
    let dir = TempDir::new().unwrap();
    write_sources(
        dir.path(),
        &[
            ("Main", SQUARE_MAIN),
            ("Square", SQUARE),
            ("SquareGame", SQUARE_GAME),
        ],
    );
    fs::write(dir.path().join("README.txt"), "not jack").unwrap();

    let results = compile_directory(dir.path());
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.is_ok()));

    let mut names: Vec<_> = results.iter().map(|r| r.filename.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["Main", "Square", "SquareGame"]);

    for result in &results {
        write_result(result, dir.path(), "").unwrap();
    }
    let main_vm = fs::read_to_string(dir.path().join("Main.vm")).unwrap();
    assert!(main_vm.starts_with("function Main.main 1\n"));
    assert!(dir.path().join("Square.vm").exists());
    assert!(!dir.path().join("Main.xml").exists());
}

#[test]
fn test_directory_failure_does_not_stop_other_units() {
    let dir = TempDir::new().unwrap();
    write_sources(
        dir.path(),
        &[
            ("Main", SEVEN),
            ("Broken", "class Broken { function void f() { return } }"),
        ],
    );

    let results = compile_directory(dir.path());
    assert_eq!(results.len(), 2);

    let broken = results.iter().find(|r| r.filename == "Broken").unwrap();
    let main = results.iter().find(|r| r.filename == "Main").unwrap();
    assert!(!broken.is_ok());
    assert!(main.is_ok());
    assert!(write_result(broken, dir.path(), "").is_err());
    assert!(!dir.path().join("Broken.vm").exists());
}

#[test]
fn test_empty_directory() {
    let dir = TempDir::new().unwrap();
    assert!(compile_directory(dir.path()).is_empty());
}

#[test]
fn test_missing_input_is_io_error() {
    let result = compile_file(Path::new("/nonexistent/Main.jack"));
    assert_eq!(result.filename, "Main");
    assert!(matches!(result.error, Some(CompileError::Io { .. })));

    let results = compile_directory(Path::new("/nonexistent/dir"));
    assert_eq!(results.len(), 1);
    assert!(!results[0].is_ok());
}

#[test]
fn test_write_with_suffix_and_trace() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_sources(src.path(), &[("Main", SEVEN)]);

    let results = compile_directory_with_options(src.path(), CompileOptions { trace: true });
    assert_eq!(results.len(), 1);
    write_result(&results[0], out.path(), ".out").unwrap();

    let vm = fs::read_to_string(out.path().join("Main.out.vm")).unwrap();
    assert_eq!(vm, compile_ok(SEVEN, "Main"));

    let xml = fs::read_to_string(out.path().join("Main.out.xml")).unwrap();
    assert!(xml.starts_with("<class>\n"));
    assert!(xml.contains("<doStatement>"));
    assert!(xml.contains("<identifier category=\"className\" used> Output </identifier>"));
    assert!(xml.contains("<identifier category=\"subroutineName\" used> printInt </identifier>"));
    assert!(xml.contains("<integerConstant> 1 </integerConstant>"));
}

#[test]
fn test_trace_annotates_declarations_and_uses() {
    let result = compile_source_with_options(SQUARE, "Square", CompileOptions { trace: true });
    let xml = result.trace.expect("trace requested");

    assert!(xml.contains(
        "<identifier category=\"varName\" kind=\"field\" index=\"2\" defined> size </identifier>"
    ));
    assert!(xml.contains(
        "<identifier category=\"varName\" kind=\"argument\" index=\"2\" defined> Asize </identifier>"
    ));
    assert!(xml.contains(
        "<identifier category=\"varName\" kind=\"field\" index=\"0\" used> x </identifier>"
    ));
    assert!(xml.contains("<keyword> this </keyword>"));
}
