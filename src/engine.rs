//! Single-pass compilation engine: recursive-descent parser and VM code
//! generator in one.
//!
//! Each grammar production is one method. While a production is recognised
//! the engine records declarations in the symbol table and emits VM
//! instructions through the writer, so no syntax tree is ever built. Any
//! mismatch aborts the unit with the first error.

use crate::error::CompileError;
use crate::label::{ControlFlow, LabelGenerator};
use crate::lexer::Lexer;
use crate::symbol_table::{SymbolKind, SymbolTable, Type};
use crate::token::{Keyword, Span, SpannedToken, Token};
use crate::trace::{IdentifierRole, IdentifierUse, TraceWriter};
use crate::vm_writer::{Command, Segment, VMWriter};
use std::io::BufRead;

/// Maximum nesting depth of statement blocks and terms, counted together,
/// before the engine bails out. Guards the native stack against input like
/// `((((((...))))))`, `------x` or thousands of nested `while` blocks.
const MAX_DEPTH: usize = 64;

/// Largest value `push constant` accepts.
const MAX_CONSTANT: u32 = 32767;

/// The three flavours of Jack subroutine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

/// Where the engine currently is: threaded through statement and
/// expression compilation.
#[derive(Debug, Clone, Copy)]
struct Context<'a> {
    class_name: &'a str,
    subroutine_name: &'a str,
    kind: SubroutineKind,
}

/// Output of a successfully compiled class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledUnit {
    pub class_name: String,
    pub vm_code: String,
    /// Parse-tree trace, when requested.
    pub trace: Option<String>,
}

pub struct CompilationEngine<R> {
    lexer: Lexer<R>,
    symbols: SymbolTable,
    labels: LabelGenerator,
    vm: VMWriter,
    trace: Option<TraceWriter>,
    depth: usize,
}

impl<R: BufRead> CompilationEngine<R> {
    pub fn new(lexer: Lexer<R>) -> Self {
        Self {
            lexer,
            symbols: SymbolTable::new(),
            labels: LabelGenerator::new(),
            vm: VMWriter::new(),
            trace: None,
            depth: 0,
        }
    }

    /// Also record the parse-tree trace while compiling.
    pub fn with_trace(mut self) -> Self {
        self.trace = Some(TraceWriter::new());
        self
    }

    /// Compile exactly one class; nothing may follow it.
    pub fn compile(mut self) -> Result<CompiledUnit, CompileError> {
        self.lexer.advance()?;
        let class_name = self.compile_class()?;

        if self.lexer.current().is_some() {
            return Err(self.unexpected("end of input"));
        }

        Ok(CompiledUnit {
            class_name,
            vm_code: self.vm.into_output(),
            trace: self.trace.map(TraceWriter::into_output),
        })
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn peek_token(&self) -> Option<&Token> {
        self.lexer.current().map(|t| &t.token)
    }

    fn peek_keyword(&self) -> Option<Keyword> {
        match self.peek_token() {
            Some(Token::Keyword(k)) => Some(*k),
            _ => None,
        }
    }

    fn peek_symbol(&self) -> Option<char> {
        match self.peek_token() {
            Some(Token::Symbol(c)) => Some(*c),
            _ => None,
        }
    }

    fn current_span(&self) -> Span {
        self.lexer
            .current()
            .map(|t| t.span)
            .unwrap_or_else(|| self.lexer.position())
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        let found = self
            .peek_token()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "end of input".to_string());
        CompileError::syntax(self.current_span(), expected, found)
    }

    /// Consume the current token. Identifiers are traced by the caller,
    /// which knows their role.
    fn bump(&mut self) -> Result<SpannedToken, CompileError> {
        let Some(token) = self.lexer.current().cloned() else {
            return Err(self.unexpected("a token"));
        };
        if let Some(trace) = self.trace.as_mut()
            && !matches!(token.token, Token::Identifier(_))
        {
            trace.token(&token.token);
        }
        self.lexer.advance()?;
        Ok(token)
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<Span, CompileError> {
        if self.peek_keyword() == Some(keyword) {
            Ok(self.bump()?.span)
        } else {
            Err(self.unexpected(&format!("keyword '{}'", keyword.as_str())))
        }
    }

    fn expect_symbol(&mut self, symbol: char) -> Result<Span, CompileError> {
        if self.peek_symbol() == Some(symbol) {
            Ok(self.bump()?.span)
        } else {
            Err(self.unexpected(&format!("'{}'", symbol)))
        }
    }

    fn expect_identifier(&mut self) -> Result<(String, Span), CompileError> {
        match self.peek_token() {
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                let span = self.bump()?.span;
                Ok((name, span))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    // ========================================================================
    // Trace helpers
    // ========================================================================

    fn open(&mut self, tag: &str) {
        if let Some(trace) = self.trace.as_mut() {
            trace.open_tag(tag);
        }
    }

    fn close(&mut self, tag: &str) {
        if let Some(trace) = self.trace.as_mut() {
            trace.close_tag(tag);
        }
    }

    fn trace_identifier(&mut self, name: &str, role: IdentifierRole, defined: bool) {
        let Some(trace) = self.trace.as_mut() else {
            return;
        };
        let binding = match role {
            IdentifierRole::VarName => self.symbols.lookup(name).map(|s| (s.kind, s.index)),
            _ => None,
        };
        trace.identifier(IdentifierUse {
            name,
            role,
            binding,
            defined,
        });
    }

    // ========================================================================
    // Program structure
    // ========================================================================

    /// class: 'class' className '{' classVarDec* subroutineDec* '}'
    fn compile_class(&mut self) -> Result<String, CompileError> {
        self.open("class");
        self.expect_keyword(Keyword::Class)?;
        let (class_name, _) = self.expect_identifier()?;
        self.trace_identifier(&class_name, IdentifierRole::ClassName, true);
        self.expect_symbol('{')?;

        while matches!(self.peek_keyword(), Some(Keyword::Static | Keyword::Field)) {
            self.compile_class_var_dec()?;
        }

        while matches!(
            self.peek_keyword(),
            Some(Keyword::Constructor | Keyword::Function | Keyword::Method)
        ) {
            self.compile_subroutine_dec(&class_name)?;
        }

        self.expect_symbol('}')?;
        self.close("class");
        Ok(class_name)
    }

    /// classVarDec: ('static' | 'field') type varName (',' varName)* ';'
    fn compile_class_var_dec(&mut self) -> Result<(), CompileError> {
        self.open("classVarDec");
        let kind = match self.peek_keyword() {
            Some(Keyword::Static) => SymbolKind::Static,
            Some(Keyword::Field) => SymbolKind::Field,
            _ => return Err(self.unexpected("'static' or 'field'")),
        };
        self.bump()?;
        self.compile_var_names(kind)?;
        self.close("classVarDec");
        Ok(())
    }

    /// varDec: 'var' type varName (',' varName)* ';'
    fn compile_var_dec(&mut self) -> Result<(), CompileError> {
        self.open("varDec");
        self.expect_keyword(Keyword::Var)?;
        self.compile_var_names(SymbolKind::Local)?;
        self.close("varDec");
        Ok(())
    }

    /// type varName (',' varName)* ';', the tail shared by both declarations.
    fn compile_var_names(&mut self, kind: SymbolKind) -> Result<(), CompileError> {
        let var_type = self.compile_type()?;
        loop {
            let (name, span) = self.expect_identifier()?;
            self.symbols.define(&name, var_type.clone(), kind, span)?;
            self.trace_identifier(&name, IdentifierRole::VarName, true);

            if self.peek_symbol() == Some(',') {
                self.bump()?;
            } else {
                break;
            }
        }
        self.expect_symbol(';')?;
        Ok(())
    }

    fn at_type(&self) -> bool {
        matches!(
            self.peek_token(),
            Some(
                Token::Keyword(Keyword::Int | Keyword::Char | Keyword::Boolean)
                    | Token::Identifier(_)
            )
        )
    }

    /// type: 'int' | 'char' | 'boolean' | className
    fn compile_type(&mut self) -> Result<Type, CompileError> {
        let var_type = match self.peek_token() {
            Some(Token::Keyword(Keyword::Int)) => Type::Int,
            Some(Token::Keyword(Keyword::Char)) => Type::Char,
            Some(Token::Keyword(Keyword::Boolean)) => Type::Boolean,
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.trace_identifier(&name, IdentifierRole::ClassName, false);
                Type::ClassName(name)
            }
            _ => return Err(self.unexpected("type (int, char, boolean or class name)")),
        };
        self.bump()?;
        Ok(var_type)
    }

    /// subroutineDec: ('constructor' | 'function' | 'method') ('void' | type)
    ///                subroutineName '(' parameterList ')' subroutineBody
    fn compile_subroutine_dec(&mut self, class_name: &str) -> Result<(), CompileError> {
        self.open("subroutineDec");
        self.symbols.start_subroutine();

        let kind = match self.peek_keyword() {
            Some(Keyword::Constructor) => SubroutineKind::Constructor,
            Some(Keyword::Function) => SubroutineKind::Function,
            Some(Keyword::Method) => SubroutineKind::Method,
            _ => return Err(self.unexpected("'constructor', 'function' or 'method'")),
        };
        let span = self.bump()?.span;

        // The receiver is argument 0, ahead of every declared parameter.
        if kind == SubroutineKind::Method {
            self.symbols.define(
                "this",
                Type::ClassName(class_name.to_string()),
                SymbolKind::Argument,
                span,
            )?;
        }

        if self.peek_keyword() == Some(Keyword::Void) {
            self.bump()?;
        } else {
            self.compile_type()?;
        }

        let (subroutine_name, _) = self.expect_identifier()?;
        self.trace_identifier(&subroutine_name, IdentifierRole::SubroutineName, true);

        self.expect_symbol('(')?;
        self.compile_parameter_list()?;
        self.expect_symbol(')')?;

        let cx = Context {
            class_name,
            subroutine_name: &subroutine_name,
            kind,
        };
        self.compile_subroutine_body(&cx)?;
        self.close("subroutineDec");
        Ok(())
    }

    /// parameterList: ((type varName) (',' type varName)*)?
    fn compile_parameter_list(&mut self) -> Result<(), CompileError> {
        self.open("parameterList");
        if self.at_type() {
            loop {
                let var_type = self.compile_type()?;
                let (name, span) = self.expect_identifier()?;
                self.symbols
                    .define(&name, var_type, SymbolKind::Argument, span)?;
                self.trace_identifier(&name, IdentifierRole::VarName, true);

                if self.peek_symbol() == Some(',') {
                    self.bump()?;
                } else {
                    break;
                }
            }
        }
        self.close("parameterList");
        Ok(())
    }

    /// subroutineBody: '{' varDec* statements '}'
    fn compile_subroutine_body(&mut self, cx: &Context<'_>) -> Result<(), CompileError> {
        self.open("subroutineBody");
        self.expect_symbol('{')?;

        while self.peek_keyword() == Some(Keyword::Var) {
            self.compile_var_dec()?;
        }

        let full_name = format!("{}.{}", cx.class_name, cx.subroutine_name);
        self.vm
            .write_function(&full_name, self.symbols.var_count(SymbolKind::Local));

        match cx.kind {
            SubroutineKind::Constructor => {
                let fields = self.symbols.var_count(SymbolKind::Field);
                let size = constant(u32::from(fields)).ok_or_else(|| {
                    CompileError::invalid_operand(format!(
                        "class {} declares {} fields, more than an object can hold",
                        cx.class_name, fields
                    ))
                })?;
                self.vm.write_push(Segment::Constant, size)?;
                self.vm.write_call("Memory.alloc", 1);
                self.vm.write_pop(Segment::Pointer, 0)?;
            }
            SubroutineKind::Method => {
                self.vm.write_push(Segment::Argument, 0)?;
                self.vm.write_pop(Segment::Pointer, 0)?;
            }
            SubroutineKind::Function => {}
        }

        self.compile_statements(cx)?;
        self.expect_symbol('}')?;
        self.close("subroutineBody");
        Ok(())
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// Enter one nesting level of statements or terms.
    fn descend(&mut self, what: &str) -> Result<(), CompileError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.unexpected(&format!(
                "{} nested at most {} levels deep",
                what, MAX_DEPTH
            )));
        }
        self.depth += 1;
        Ok(())
    }

    fn compile_statements(&mut self, cx: &Context<'_>) -> Result<(), CompileError> {
        self.descend("statements")?;
        self.open("statements");
        loop {
            match self.peek_keyword() {
                Some(Keyword::Let) => self.compile_let(cx)?,
                Some(Keyword::If) => self.compile_if(cx)?,
                Some(Keyword::While) => self.compile_while(cx)?,
                Some(Keyword::Do) => self.compile_do(cx)?,
                Some(Keyword::Return) => self.compile_return(cx)?,
                _ => break,
            }
        }
        self.close("statements");
        self.depth -= 1;
        Ok(())
    }

    /// letStatement: 'let' varName ('[' expression ']')? '=' expression ';'
    fn compile_let(&mut self, cx: &Context<'_>) -> Result<(), CompileError> {
        self.open("letStatement");
        self.expect_keyword(Keyword::Let)?;
        let (name, span) = self.expect_identifier()?;
        let (segment, index) = self.resolve(&name, span)?;
        self.trace_identifier(&name, IdentifierRole::VarName, false);

        if self.peek_symbol() == Some('[') {
            self.bump()?;
            self.vm.write_push(segment, index)?;
            self.compile_expression(cx)?;
            self.expect_symbol(']')?;
            self.vm.write_arithmetic(Command::Add);

            self.expect_symbol('=')?;
            self.compile_expression(cx)?;

            // The target address sits under the value; park the value first.
            self.vm.write_pop(Segment::Temp, 0)?;
            self.vm.write_pop(Segment::Pointer, 1)?;
            self.vm.write_push(Segment::Temp, 0)?;
            self.vm.write_pop(Segment::That, 0)?;
        } else {
            self.expect_symbol('=')?;
            self.compile_expression(cx)?;
            self.vm.write_pop(segment, index)?;
        }

        self.expect_symbol(';')?;
        self.close("letStatement");
        Ok(())
    }

    /// ifStatement: 'if' '(' expression ')' '{' statements '}'
    ///              ('else' '{' statements '}')?
    fn compile_if(&mut self, cx: &Context<'_>) -> Result<(), CompileError> {
        self.open("ifStatement");
        self.expect_keyword(Keyword::If)?;
        self.expect_symbol('(')?;
        self.compile_expression(cx)?;
        self.expect_symbol(')')?;

        let labels = self
            .labels
            .next_pair(cx.class_name, cx.subroutine_name, ControlFlow::If)?;
        self.vm.write_arithmetic(Command::Not);
        self.vm.write_if_goto(&labels.first);

        self.expect_symbol('{')?;
        self.compile_statements(cx)?;
        self.expect_symbol('}')?;

        if self.peek_keyword() == Some(Keyword::Else) {
            self.bump()?;
            self.vm.write_goto(&labels.second);
            self.vm.write_label(&labels.first);

            self.expect_symbol('{')?;
            self.compile_statements(cx)?;
            self.expect_symbol('}')?;
            self.vm.write_label(&labels.second);
        } else {
            self.vm.write_label(&labels.first);
        }

        self.close("ifStatement");
        Ok(())
    }

    /// whileStatement: 'while' '(' expression ')' '{' statements '}'
    fn compile_while(&mut self, cx: &Context<'_>) -> Result<(), CompileError> {
        self.open("whileStatement");
        self.expect_keyword(Keyword::While)?;
        self.expect_symbol('(')?;

        let labels = self
            .labels
            .next_pair(cx.class_name, cx.subroutine_name, ControlFlow::While)?;
        self.vm.write_label(&labels.first);
        self.compile_expression(cx)?;
        self.expect_symbol(')')?;
        self.vm.write_arithmetic(Command::Not);
        self.vm.write_if_goto(&labels.second);

        self.expect_symbol('{')?;
        self.compile_statements(cx)?;
        self.expect_symbol('}')?;
        self.vm.write_goto(&labels.first);
        self.vm.write_label(&labels.second);

        self.close("whileStatement");
        Ok(())
    }

    /// doStatement: 'do' subroutineCall ';'
    fn compile_do(&mut self, cx: &Context<'_>) -> Result<(), CompileError> {
        self.open("doStatement");
        self.expect_keyword(Keyword::Do)?;
        let (name, span) = self.expect_identifier()?;
        self.compile_subroutine_call(cx, &name, span)?;
        // `do` discards the return value.
        self.vm.write_pop(Segment::Temp, 0)?;
        self.expect_symbol(';')?;
        self.close("doStatement");
        Ok(())
    }

    /// returnStatement: 'return' expression? ';'
    fn compile_return(&mut self, cx: &Context<'_>) -> Result<(), CompileError> {
        self.open("returnStatement");
        self.expect_keyword(Keyword::Return)?;
        if self.peek_symbol() == Some(';') {
            self.vm.write_push(Segment::Constant, 0)?;
        } else {
            self.compile_expression(cx)?;
        }
        self.vm.write_return();
        self.expect_symbol(';')?;
        self.close("returnStatement");
        Ok(())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// expression: term (op term)*, evaluated strictly left to right.
    fn compile_expression(&mut self, cx: &Context<'_>) -> Result<(), CompileError> {
        self.open("expression");
        self.compile_term(cx)?;

        while let Some(op) = self.peek_symbol().and_then(BinaryOp::from_symbol) {
            self.bump()?;
            self.compile_term(cx)?;
            match op {
                BinaryOp::Native(cmd) => self.vm.write_arithmetic(cmd),
                BinaryOp::Library(name) => self.vm.write_call(name, 2),
            }
        }

        self.close("expression");
        Ok(())
    }

    fn compile_term(&mut self, cx: &Context<'_>) -> Result<(), CompileError> {
        self.descend("expression")?;
        self.open("term");
        self.compile_term_inner(cx)?;
        self.close("term");
        self.depth -= 1;
        Ok(())
    }

    fn compile_term_inner(&mut self, cx: &Context<'_>) -> Result<(), CompileError> {
        let Some(SpannedToken { token, span }) = self.lexer.current().cloned() else {
            return Err(self.unexpected("expression"));
        };

        match token {
            Token::IntegerConstant(value) => {
                let value = constant(value).ok_or_else(|| {
                    CompileError::lexical(
                        span,
                        format!("integer constant {} exceeds maximum value 32767", value),
                    )
                })?;
                self.bump()?;
                self.vm.write_push(Segment::Constant, value)?;
            }

            Token::StringConstant(s) => {
                self.bump()?;
                self.compile_string_constant(&s, span)?;
            }

            Token::Keyword(Keyword::True) => {
                self.bump()?;
                self.vm.write_push(Segment::Constant, 1)?;
                self.vm.write_arithmetic(Command::Neg);
            }

            Token::Keyword(Keyword::False | Keyword::Null) => {
                self.bump()?;
                self.vm.write_push(Segment::Constant, 0)?;
            }

            Token::Keyword(Keyword::This) => {
                self.bump()?;
                self.push_receiver(cx, span)?;
            }

            Token::Symbol('(') => {
                self.bump()?;
                self.compile_expression(cx)?;
                self.expect_symbol(')')?;
            }

            Token::Symbol(op @ ('-' | '~')) => {
                self.bump()?;
                self.compile_term(cx)?;
                let cmd = if op == '-' { Command::Neg } else { Command::Not };
                self.vm.write_arithmetic(cmd);
            }

            Token::Identifier(name) => {
                self.bump()?;
                match self.peek_symbol() {
                    Some('[') => {
                        let (segment, index) = self.resolve(&name, span)?;
                        self.trace_identifier(&name, IdentifierRole::VarName, false);
                        self.bump()?;
                        self.vm.write_push(segment, index)?;
                        self.compile_expression(cx)?;
                        self.expect_symbol(']')?;
                        self.vm.write_arithmetic(Command::Add);
                        self.vm.write_pop(Segment::Pointer, 1)?;
                        self.vm.write_push(Segment::That, 0)?;
                    }
                    Some('(' | '.') => self.compile_subroutine_call(cx, &name, span)?,
                    _ => {
                        let (segment, index) = self.resolve(&name, span)?;
                        self.trace_identifier(&name, IdentifierRole::VarName, false);
                        self.vm.write_push(segment, index)?;
                    }
                }
            }

            _ => return Err(self.unexpected("expression")),
        }

        Ok(())
    }

    /// Build a string object at run time: allocate, then append each char.
    fn compile_string_constant(&mut self, s: &str, span: Span) -> Result<(), CompileError> {
        let len = u16::try_from(s.chars().count())
            .ok()
            .filter(|&n| u32::from(n) <= MAX_CONSTANT)
            .ok_or_else(|| CompileError::lexical(span, "string constant too long"))?;
        self.vm.write_push(Segment::Constant, len)?;
        self.vm.write_call("String.new", 1);

        for ch in s.chars() {
            let code = constant(ch as u32).ok_or_else(|| {
                CompileError::lexical(span, format!("character '{}' has no VM encoding", ch))
            })?;
            self.vm.write_push(Segment::Constant, code)?;
            self.vm.write_call("String.appendChar", 2);
        }
        Ok(())
    }

    /// Push the current object: the bound receiver argument inside a method,
    /// the freshly allocated pointer inside a constructor.
    fn push_receiver(&mut self, cx: &Context<'_>, span: Span) -> Result<(), CompileError> {
        match cx.kind {
            SubroutineKind::Method => self.vm.write_push(Segment::Argument, 0),
            SubroutineKind::Constructor => self.vm.write_push(Segment::Pointer, 0),
            SubroutineKind::Function => Err(CompileError::undefined_symbol("this", span)),
        }
    }

    /// subroutineCall: subroutineName '(' expressionList ')'
    ///               | (className | varName) '.' subroutineName '(' expressionList ')'
    ///
    /// `name` has already been consumed.
    fn compile_subroutine_call(
        &mut self,
        cx: &Context<'_>,
        name: &str,
        span: Span,
    ) -> Result<(), CompileError> {
        match self.peek_symbol() {
            Some('(') => {
                self.trace_identifier(name, IdentifierRole::SubroutineName, false);
                self.push_receiver(cx, span)?;
                self.bump()?;
                let num_args = self.compile_expression_list(cx)?;
                self.expect_symbol(')')?;
                self.vm.write_call(
                    &format!("{}.{}", cx.class_name, name),
                    num_args.saturating_add(1),
                );
            }
            Some('.') => {
                let receiver = self
                    .symbols
                    .lookup(name)
                    .map(|s| (s.segment(), s.index, s.symbol_type.to_string()));
                let role = if receiver.is_some() {
                    IdentifierRole::VarName
                } else {
                    IdentifierRole::ClassName
                };
                self.trace_identifier(name, role, false);
                self.bump()?;

                let (subroutine_name, _) = self.expect_identifier()?;
                self.trace_identifier(&subroutine_name, IdentifierRole::SubroutineName, false);
                self.expect_symbol('(')?;

                let (class_name, implicit_args) = match receiver {
                    // Method on an object: the object is argument 0.
                    Some((segment, index, type_name)) => {
                        self.vm.write_push(segment, index)?;
                        (type_name, 1)
                    }
                    None => (name.to_string(), 0),
                };

                let num_args = self.compile_expression_list(cx)?;
                self.expect_symbol(')')?;
                self.vm.write_call(
                    &format!("{}.{}", class_name, subroutine_name),
                    num_args.saturating_add(implicit_args),
                );
            }
            _ => return Err(self.unexpected("'(' or '.'")),
        }
        Ok(())
    }

    /// expressionList: (expression (',' expression)*)?
    ///
    /// Returns the number of expressions compiled.
    fn compile_expression_list(&mut self, cx: &Context<'_>) -> Result<u16, CompileError> {
        self.open("expressionList");
        let mut count: u16 = 0;
        if self.peek_symbol() != Some(')') {
            loop {
                self.compile_expression(cx)?;
                count = count.saturating_add(1);
                if self.peek_symbol() == Some(',') {
                    self.bump()?;
                } else {
                    break;
                }
            }
        }
        self.close("expressionList");
        Ok(count)
    }

    fn resolve(&self, name: &str, span: Span) -> Result<(Segment, u16), CompileError> {
        self.symbols
            .lookup(name)
            .map(|s| (s.segment(), s.index))
            .ok_or_else(|| CompileError::undefined_symbol(name, span))
    }
}

/// How a binary operator is realised in VM code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Native(Command),
    /// The VM has no multiply or divide; these go through the OS.
    Library(&'static str),
}

impl BinaryOp {
    fn from_symbol(c: char) -> Option<Self> {
        Some(match c {
            '+' => BinaryOp::Native(Command::Add),
            '-' => BinaryOp::Native(Command::Sub),
            '&' => BinaryOp::Native(Command::And),
            '|' => BinaryOp::Native(Command::Or),
            '<' => BinaryOp::Native(Command::Lt),
            '>' => BinaryOp::Native(Command::Gt),
            '=' => BinaryOp::Native(Command::Eq),
            '*' => BinaryOp::Library("Math.multiply"),
            '/' => BinaryOp::Library("Math.divide"),
            _ => return None,
        })
    }
}

/// Convert to a `push constant` operand if it is in range.
fn constant(value: u32) -> Option<u16> {
    if value <= MAX_CONSTANT {
        u16::try_from(value).ok()
    } else {
        None
    }
}
