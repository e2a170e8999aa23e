//! Tree-walking evaluator
//!
//! Each [`Interpreter`] owns a fresh global scope holding only the builtins,
//! so one script run can never observe another's bindings.

use crate::ast::*;
use crate::builtins;
use crate::error::{ErrorKind, ScriptError};
use crate::parser;
use crate::value::{Function, Object, ObjectClass, Value};
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Default budget of statement and loop steps for one run
pub const DEFAULT_STEP_LIMIT: u64 = 5_000_000;

/// Default maximum nesting of script function calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 200;

/// Resource limits applied to one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub step_limit: u64,
    pub max_call_depth: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            step_limit: DEFAULT_STEP_LIMIT,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    mutable: bool,
}

/// A lexical scope
#[derive(Debug, Default)]
pub struct Scope {
    bindings: RefCell<HashMap<String, Binding>>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    pub fn global() -> Rc<Self> {
        Rc::new(Scope::default())
    }

    pub fn child(parent: &Rc<Scope>) -> Rc<Self> {
        Rc::new(Scope {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(parent)),
        })
    }

    /// Create or overwrite a binding in this scope
    pub fn define(&self, name: impl Into<String>, value: Value, mutable: bool) {
        self.bindings
            .borrow_mut()
            .insert(name.into(), Binding { value, mutable });
    }

    /// `let`/`const`: fails if this scope already has the name
    fn declare(&self, name: &str, value: Value, mutable: bool) -> Result<(), ScriptError> {
        if self.bindings.borrow().contains_key(name) {
            return Err(ScriptError::Runtime {
                kind: ErrorKind::SyntaxError,
                message: format!("Identifier '{}' has already been declared", name),
            });
        }
        self.define(name, value, mutable);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(binding) = self.bindings.borrow().get(name) {
            return Some(binding.value.clone());
        }
        let mut scope = self.parent.as_ref();
        while let Some(current) = scope {
            if let Some(binding) = current.bindings.borrow().get(name) {
                return Some(binding.value.clone());
            }
            scope = current.parent.as_ref();
        }
        None
    }

    fn assign(&self, name: &str, value: Value) -> Result<(), ScriptError> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(binding) = current.bindings.borrow_mut().get_mut(name) {
                if !binding.mutable {
                    return Err(ScriptError::type_error("Assignment to constant variable."));
                }
                binding.value = value;
                return Ok(());
            }
            scope = current.parent.as_deref();
        }
        Err(ScriptError::reference_error(format!(
            "{} is not defined",
            name
        )))
    }

    fn clear(&self) {
        self.bindings.borrow_mut().clear();
    }
}

/// How a statement finished
enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Something that can be read and written
enum Place {
    Var(String),
    Prop(Value, String),
}

pub struct Interpreter {
    globals: Rc<Scope>,
    options: RunOptions,
    steps: u64,
    depth: usize,
    last_value: Value,
}

impl Interpreter {
    pub fn new(options: RunOptions) -> Self {
        let globals = Scope::global();
        builtins::install_globals(&globals);
        Interpreter {
            globals,
            options,
            steps: 0,
            depth: 0,
            last_value: Value::Undefined,
        }
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    /// Steps consumed so far
    pub fn steps_taken(&self) -> u64 {
        self.steps
    }

    /// Parse and execute a program.
    ///
    /// Returns the value of the last expression statement evaluated.
    pub fn run(&mut self, source: &str) -> Result<Value, ScriptError> {
        let program = parser::parse(source)?;
        let globals = Rc::clone(&self.globals);
        let result = self.exec_block(&program.body, &globals);
        debug!(steps = self.steps, ok = result.is_ok(), "script finished");

        match result? {
            Flow::Normal => Ok(self.last_value.clone()),
            Flow::Return(_) => Err(ScriptError::syntax("Illegal return statement", 1, 1)),
            Flow::Break | Flow::Continue => {
                Err(ScriptError::syntax("Illegal break or continue statement", 1, 1))
            }
        }
    }

    fn tick(&mut self) -> Result<(), ScriptError> {
        self.steps += 1;
        if self.steps > self.options.step_limit {
            return Err(ScriptError::StepLimit {
                limit: self.options.step_limit,
            });
        }
        Ok(())
    }

    fn hoist(&mut self, stmts: &[Stmt], scope: &Rc<Scope>) {
        for stmt in stmts {
            if let Stmt::Function(def) = stmt
                && let Some(name) = &def.name
            {
                scope.define(name.clone(), self.closure(def, scope), true);
            }
        }
    }

    fn closure(&self, def: &Rc<FunctionDef>, scope: &Rc<Scope>) -> Value {
        Value::Function(Rc::new(Function::Script {
            def: Rc::clone(def),
            env: Rc::clone(scope),
        }))
    }

    fn exec_block(&mut self, stmts: &[Stmt], scope: &Rc<Scope>) -> Result<Flow, ScriptError> {
        self.hoist(stmts, scope);
        for stmt in stmts {
            match self.exec_stmt(stmt, scope)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, scope: &Rc<Scope>) -> Result<Flow, ScriptError> {
        self.tick()?;

        match stmt {
            Stmt::Empty | Stmt::Function(_) => Ok(Flow::Normal),
            Stmt::Expr(expr) => {
                self.last_value = self.eval(expr, scope)?;
                Ok(Flow::Normal)
            }
            Stmt::Declare { kind, declarations } => {
                for (name, init) in declarations {
                    let value = match init {
                        Some(expr) => self.eval(expr, scope)?,
                        None => Value::Undefined,
                    };
                    match kind {
                        DeclKind::Var => scope.define(name.clone(), value, true),
                        _ => scope.declare(name, value, kind.is_mutable())?,
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.is_truthy() {
                    self.exec_stmt(consequent, scope)
                } else if let Some(alternate) = alternate {
                    self.exec_stmt(alternate, scope)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Block(body) => {
                let inner = Scope::child(scope);
                self.exec_block(body, &inner)
            }
            Stmt::While { test, body } => {
                while self.eval(test, scope)?.is_truthy() {
                    self.tick()?;
                    match self.exec_stmt(body, scope)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::DoWhile { body, test } => {
                loop {
                    self.tick()?;
                    match self.exec_stmt(body, scope)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if !self.eval(test, scope)?.is_truthy() {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => self.exec_for(init.as_deref(), test.as_ref(), update.as_ref(), body, scope),
            Stmt::ForOf {
                kind,
                name,
                iterable,
                body,
            } => {
                let items = iterate(self.eval(iterable, scope)?)?;
                for item in items {
                    self.tick()?;
                    let iteration = Scope::child(scope);
                    iteration.define(name.clone(), item, kind.is_mutable());
                    match self.exec_stmt(body, &iteration)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Throw(expr) => Err(ScriptError::Thrown(self.eval(expr, scope)?)),
            Stmt::Try {
                block,
                param,
                handler,
                finalizer,
            } => {
                let mut result = self.exec_block(block, &Scope::child(scope));

                if let Some(handler) = handler
                    && let Err(err) = &result
                    && err.is_catchable()
                {
                    let catch_scope = Scope::child(scope);
                    if let Some(param) = param {
                        catch_scope.define(param.clone(), error_value(err), true);
                    }
                    result = self.exec_block(handler, &catch_scope);
                }

                if let Some(finalizer) = finalizer {
                    match self.exec_block(finalizer, &Scope::child(scope))? {
                        Flow::Normal => {}
                        flow => return Ok(flow),
                    }
                }
                result
            }
        }
    }

    /// C-style `for`. `let` bindings from the initializer get a fresh copy
    /// per iteration so closures capture that iteration's value.
    fn exec_for(
        &mut self,
        init: Option<&Stmt>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        scope: &Rc<Scope>,
    ) -> Result<Flow, ScriptError> {
        let loop_scope = Scope::child(scope);
        let mut per_iteration = Vec::new();
        if let Some(init) = init {
            if let Stmt::Declare {
                kind: DeclKind::Let | DeclKind::Const,
                declarations,
            } = init
            {
                per_iteration.extend(declarations.iter().map(|(name, _)| name.clone()));
            }
            self.exec_stmt(init, &loop_scope)?;
        }

        loop {
            if let Some(test) = test
                && !self.eval(test, &loop_scope)?.is_truthy()
            {
                break;
            }
            self.tick()?;

            let iteration = Scope::child(&loop_scope);
            for name in &per_iteration {
                if let Some(value) = loop_scope.lookup(name) {
                    iteration.define(name.clone(), value, true);
                }
            }
            let flow = self.exec_stmt(body, &iteration)?;
            for name in &per_iteration {
                if let Some(value) = iteration.lookup(name) {
                    loop_scope.assign(name, value)?;
                }
            }

            match flow {
                Flow::Break => break,
                Flow::Return(v) => return Ok(Flow::Return(v)),
                Flow::Normal | Flow::Continue => {}
            }
            if let Some(update) = update {
                self.eval(update, &loop_scope)?;
            }
        }
        Ok(Flow::Normal)
    }

    fn eval(&mut self, expr: &Expr, scope: &Rc<Scope>) -> Result<Value, ScriptError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Str(Rc::clone(s))),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Template(segments) => {
                let mut out = String::new();
                for segment in segments {
                    match segment {
                        TemplateSegment::Text(text) => {
                            builtins::check_string_length(out.len() + text.len())?;
                            out.push_str(text)
                        }
                        TemplateSegment::Expr(expr) => {
                            let piece = self.eval(expr, scope)?.to_js_string();
                            builtins::check_string_length(out.len() + piece.len())?;
                            out.push_str(&piece)
                        }
                    }
                }
                Ok(Value::from(out))
            }
            Expr::Ident(name) => scope
                .lookup(name)
                .ok_or_else(|| ScriptError::reference_error(format!("{} is not defined", name))),
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, scope)?);
                }
                Ok(Value::array(values))
            }
            Expr::Object(properties) => {
                let mut object = Object::new(ObjectClass::Plain);
                for (key, value) in properties {
                    let value = self.eval(value, scope)?;
                    object.set(key.clone(), value);
                }
                Ok(Value::object(object))
            }
            Expr::Function(def) => Ok(self.closure(def, scope)),
            Expr::Unary { op, operand } => self.eval_unary(*op, operand, scope),
            Expr::Update {
                increment,
                prefix,
                target,
            } => {
                let place = self.place(target, scope)?;
                let old = self.read_place(&place, scope)?.to_number();
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                self.write_place(place, Value::Number(new), scope)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                binary_op(*op, &left, &right)
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left, scope)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, scope)
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.is_truthy() {
                    self.eval(consequent, scope)
                } else {
                    self.eval(alternate, scope)
                }
            }
            Expr::Assign { op, target, value } => {
                let place = self.place(target, scope)?;
                let value = match op {
                    None => self.eval(value, scope)?,
                    Some(op) => {
                        let current = self.read_place(&place, scope)?;
                        let rhs = self.eval(value, scope)?;
                        binary_op(*op, &current, &rhs)?
                    }
                };
                self.write_place(place, value.clone(), scope)?;
                Ok(value)
            }
            Expr::Member {
                object, property, ..
            } => {
                let object = self.eval(object, scope)?;
                let key = self.eval(property, scope)?.to_property_key();
                builtins::get_property(&object, &key)
            }
            Expr::Call { callee, args } => {
                let func = self.eval(callee, scope)?;
                let args = self.eval_args(args, scope)?;
                if !matches!(func, Value::Function(_)) {
                    return Err(ScriptError::type_error(format!(
                        "{} is not a function",
                        describe_callee(callee)
                    )));
                }
                self.call_value(&func, args)
            }
            Expr::New { callee, args } => {
                let func = self.eval(callee, scope)?;
                let args = self.eval_args(args, scope)?;
                let constructible = matches!(
                    &func,
                    Value::Function(f) if matches!(
                        f.as_ref(),
                        Function::Native { name, .. } if ErrorKind::from_name(name).is_some()
                    )
                );
                if !constructible {
                    return Err(ScriptError::type_error(format!(
                        "{} is not a constructor",
                        describe_callee(callee)
                    )));
                }
                self.call_value(&func, args)
            }
        }
    }

    fn eval_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expr,
        scope: &Rc<Scope>,
    ) -> Result<Value, ScriptError> {
        // typeof tolerates undeclared names
        if op == UnaryOp::TypeOf
            && let Expr::Ident(name) = operand
        {
            let kind = scope.lookup(name).map(|v| v.type_of()).unwrap_or("undefined");
            return Ok(Value::string(kind));
        }

        let value = self.eval(operand, scope)?;
        Ok(match op {
            UnaryOp::Not => Value::Bool(!value.is_truthy()),
            UnaryOp::Neg => Value::Number(-value.to_number()),
            UnaryOp::Plus => Value::Number(value.to_number()),
            UnaryOp::TypeOf => Value::string(value.type_of()),
        })
    }

    fn eval_args(&mut self, args: &[Expr], scope: &Rc<Scope>) -> Result<Vec<Value>, ScriptError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg, scope)?);
        }
        Ok(values)
    }

    fn place(&mut self, target: &Expr, scope: &Rc<Scope>) -> Result<Place, ScriptError> {
        match target {
            Expr::Ident(name) => Ok(Place::Var(name.clone())),
            Expr::Member {
                object, property, ..
            } => {
                let object = self.eval(object, scope)?;
                let key = self.eval(property, scope)?.to_property_key();
                Ok(Place::Prop(object, key))
            }
            // The parser only produces assignable targets
            _ => Err(ScriptError::syntax("Invalid left-hand side in assignment", 1, 1)),
        }
    }

    fn read_place(&mut self, place: &Place, scope: &Rc<Scope>) -> Result<Value, ScriptError> {
        match place {
            Place::Var(name) => scope
                .lookup(name)
                .ok_or_else(|| ScriptError::reference_error(format!("{} is not defined", name))),
            Place::Prop(object, key) => builtins::get_property(object, key),
        }
    }

    fn write_place(
        &mut self,
        place: Place,
        value: Value,
        scope: &Rc<Scope>,
    ) -> Result<(), ScriptError> {
        match place {
            Place::Var(name) => scope.assign(&name, value),
            Place::Prop(object, key) => builtins::set_property(&object, &key, value),
        }
    }

    /// Invoke a function value with the given arguments
    pub fn call_value(&mut self, func: &Value, args: Vec<Value>) -> Result<Value, ScriptError> {
        let Value::Function(func) = func else {
            return Err(ScriptError::type_error(format!(
                "{} is not a function",
                describe_value(func)
            )));
        };
        self.tick()?;

        match func.as_ref() {
            Function::Native { receiver, call, .. } => call(self, receiver, args),
            Function::Script { def, env } => {
                if self.depth >= self.options.max_call_depth {
                    return Err(ScriptError::range_error(
                        "Maximum call stack size exceeded",
                    ));
                }

                let scope = Scope::child(env);
                let mut args = args.into_iter();
                for param in &def.params {
                    scope.define(param.clone(), args.next().unwrap_or(Value::Undefined), true);
                }

                self.depth += 1;
                let result = match &def.body {
                    FunctionBody::Expr(expr) => self.eval(expr, &scope),
                    FunctionBody::Block(body) => match self.exec_block(body, &scope) {
                        Ok(Flow::Return(value)) => Ok(value),
                        Ok(_) => Ok(Value::Undefined),
                        Err(e) => Err(e),
                    },
                };
                self.depth -= 1;
                result
            }
        }
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        // Global closures capture the global scope; clearing it breaks the cycle
        self.globals.clear();
    }
}

fn iterate(value: Value) -> Result<Vec<Value>, ScriptError> {
    match value {
        Value::Array(items) => Ok(items.borrow().clone()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::string(c.to_string())).collect()),
        other => Err(ScriptError::type_error(format!(
            "{} is not iterable",
            describe_value(&other)
        ))),
    }
}

/// The value a `catch` clause binds for an error
fn error_value(err: &ScriptError) -> Value {
    match err {
        ScriptError::Thrown(value) => value.clone(),
        ScriptError::Runtime { kind, message } => Value::error(*kind, message),
        ScriptError::Syntax { message, .. } => Value::error(ErrorKind::SyntaxError, message),
        ScriptError::StepLimit { .. } => Value::error(ErrorKind::RangeError, err.message()),
    }
}

fn binary_op(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, ScriptError> {
    let value = match op {
        BinaryOp::Add => {
            let stringy = |v: &Value| {
                matches!(
                    v,
                    Value::Str(_) | Value::Array(_) | Value::Object(_) | Value::Function(_)
                )
            };
            if stringy(left) || stringy(right) {
                let (left, right) = (as_js_str(left), as_js_str(right));
                builtins::check_string_length(left.len().saturating_add(right.len()))?;
                let mut out = String::with_capacity(left.len() + right.len());
                out.push_str(&left);
                out.push_str(&right);
                Value::from(out)
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Pow => {
            let (base, exp) = (left.to_number(), right.to_number());
            if exp.is_nan() {
                Value::Number(f64::NAN)
            } else {
                Value::Number(base.powf(exp))
            }
        }
        BinaryOp::Eq => Value::Bool(left.loose_equals(right)),
        BinaryOp::NotEq => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNotEq => Value::Bool(!left.strict_equals(right)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            Value::Bool(compare(op, left, right))
        }
    };
    Ok(value)
}

/// String form of a value, borrowing when it already is a string
fn as_js_str(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Str(s) => Cow::Borrowed(&**s),
        other => Cow::Owned(other.to_js_string()),
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> bool {
    if let (Value::Str(a), Value::Str(b)) = (left, right) {
        return match op {
            BinaryOp::Lt => a < b,
            BinaryOp::LtEq => a <= b,
            BinaryOp::Gt => a > b,
            _ => a >= b,
        };
    }
    let (a, b) = (left.to_number(), right.to_number());
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::LtEq => a <= b,
        BinaryOp::Gt => a > b,
        _ => a >= b,
    }
}

/// Source-like name of a callee for error messages
fn describe_callee(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member {
            object,
            property,
            dotted: true,
        } => match property.as_ref() {
            Expr::Str(name) => format!("{}.{}", describe_callee(object), name),
            _ => "expression".to_string(),
        },
        Expr::Member { object, .. } => format!("{}[...]", describe_callee(object)),
        Expr::Call { callee, .. } => format!("{}(...)", describe_callee(callee)),
        _ => "expression".to_string(),
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Str(s) => format!("\"{}\"", s),
        Value::Array(_) | Value::Object(_) => "object".to_string(),
        other => other.to_js_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> Value {
        Interpreter::new(RunOptions::default()).run(source).unwrap()
    }

    fn eval_str(source: &str) -> String {
        eval(source).to_js_string()
    }

    fn eval_err(source: &str) -> ScriptError {
        Interpreter::new(RunOptions::default())
            .run(source)
            .unwrap_err()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_str("1 + 2 * 3"), "7");
        assert_eq!(eval_str("(1 + 2) * 3"), "9");
        assert_eq!(eval_str("2 ** 10"), "1024");
        assert_eq!(eval_str("7 % 3"), "1");
        assert_eq!(eval_str("-7 % 3"), "-1");
        assert_eq!(eval_str("1 / 0"), "Infinity");
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(eval_str("'a' + 1"), "a1");
        assert_eq!(eval_str("1 + 2 + 'x'"), "3x");
        assert_eq!(eval_str("[1, 2] + ''"), "1,2");
        assert_eq!(eval_str("`sum: ${1 + 1}`"), "sum: 2");
    }

    #[test]
    fn test_string_growth_is_bounded() {
        let err = eval_err("let s = 'x'; for (let i = 0; i < 40; i++) s += s");
        assert_eq!(err.message(), "Invalid string length");
        assert!(err.is_catchable());

        let err = eval_err("let s = 'x'.repeat(40000000); s + s");
        assert_eq!(err.message(), "Invalid string length");

        let err = eval_err("let s = 'x'.repeat(40000000); `${s}${s}`");
        assert_eq!(err.message(), "Invalid string length");

        assert_eq!(
            eval_str("let r; try { let s = 'ab'; while (true) s = s + s } catch (e) { r = e.name }\nr"),
            "RangeError"
        );
    }

    #[test]
    fn test_let_and_const() {
        assert_eq!(eval_str("let x = 1; x = x + 1; x"), "2");
        let err = eval_err("const y = 1; y = 2");
        assert_eq!(err.message(), "Assignment to constant variable.");
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        let err = eval_err("let a = 1; let a = 2");
        assert_eq!(err.message(), "Identifier 'a' has already been declared");
        assert_eq!(eval_str("let a = 1; { let a = 2 } a"), "1");
    }

    #[test]
    fn test_unknown_name_is_reference_error() {
        let err = eval_err("missing + 1");
        assert_eq!(err.message(), "missing is not defined");
        assert!(matches!(
            err,
            ScriptError::Runtime {
                kind: ErrorKind::ReferenceError,
                ..
            }
        ));
    }

    #[test]
    fn test_typeof_undeclared() {
        assert_eq!(eval_str("typeof nothing"), "undefined");
        assert_eq!(eval_str("typeof null"), "object");
        assert_eq!(eval_str("typeof (() => 1)"), "function");
    }

    #[test]
    fn test_functions_and_closures() {
        let source = r#"
            function makeCounter() {
                let count = 0
                return () => ++count
            }
            const c = makeCounter()
            c(); c()
            c()
        "#;
        assert_eq!(eval_str(source), "3");
    }

    #[test]
    fn test_function_hoisting() {
        assert_eq!(eval_str("double(4)\nfunction double(x) { return x * 2 }"), "8");
    }

    #[test]
    fn test_recursion() {
        let source = "function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2) } fib(15)";
        assert_eq!(eval_str(source), "610");
    }

    #[test]
    fn test_call_depth_limit() {
        let mut interp = Interpreter::new(RunOptions {
            max_call_depth: 32,
            ..RunOptions::default()
        });
        let err = interp.run("function f() { return f() } f()").unwrap_err();
        assert_eq!(err.message(), "Maximum call stack size exceeded");
        assert!(err.is_catchable());
    }

    #[test]
    fn test_step_limit_stops_infinite_loop() {
        let mut interp = Interpreter::new(RunOptions {
            step_limit: 1_000,
            ..RunOptions::default()
        });
        let err = interp.run("while (true) {}").unwrap_err();
        assert!(matches!(err, ScriptError::StepLimit { limit: 1_000 }));
    }

    #[test]
    fn test_step_limit_is_not_catchable() {
        let mut interp = Interpreter::new(RunOptions {
            step_limit: 1_000,
            ..RunOptions::default()
        });
        let err = interp
            .run("try { while (true) {} } catch (e) { 'caught' }")
            .unwrap_err();
        assert!(matches!(err, ScriptError::StepLimit { .. }));
    }

    #[test]
    fn test_loops() {
        assert_eq!(
            eval_str("let s = 0; for (let i = 0; i < 5; i++) { s += i } s"),
            "10"
        );
        assert_eq!(eval_str("let n = 0; while (n < 3) n++; n"), "3");
        assert_eq!(eval_str("let n = 0; do { n++ } while (false); n"), "1");
        assert_eq!(
            eval_str("let out = ''; for (const ch of 'abc') { out = ch + out } out"),
            "cba"
        );
    }

    #[test]
    fn test_break_and_continue() {
        let source = r#"
            let s = 0
            for (let i = 0; i < 10; i++) {
                if (i % 2 === 0) continue
                if (i > 7) break
                s += i
            }
            s
        "#;
        assert_eq!(eval_str(source), "16");
    }

    #[test]
    fn test_for_let_captures_each_iteration() {
        let source = r#"
            const fns = []
            for (let i = 0; i < 3; i++) { fns.push(() => i) }
            fns.map(f => f()).join(',')
        "#;
        assert_eq!(eval_str(source), "0,1,2");
    }

    #[test]
    fn test_try_catch_finally() {
        let source = r#"
            let log = []
            try {
                log.push('try')
                throw new Error('bad')
            } catch (e) {
                log.push(e.message)
            } finally {
                log.push('finally')
            }
            log.join(' ')
        "#;
        assert_eq!(eval_str(source), "try bad finally");
    }

    #[test]
    fn test_catch_runtime_error_as_object() {
        let source = "try { null.x } catch (e) { e.name + ': ' + e.message }";
        assert_eq!(
            eval_str(source),
            "TypeError: Cannot read properties of null (reading 'x')"
        );
    }

    #[test]
    fn test_finally_return_overrides() {
        let source = "function f() { try { return 1 } finally { return 2 } } f()";
        assert_eq!(eval_str(source), "2");
    }

    #[test]
    fn test_throw_non_error_value() {
        let err = eval_err("throw 42");
        assert_eq!(err.message(), "42");
    }

    #[test]
    fn test_calling_non_function() {
        let err = eval_err("const o = {}; o.missing()");
        assert_eq!(err.message(), "o.missing is not a function");
    }

    #[test]
    fn test_new_on_non_constructor() {
        let err = eval_err("function F() {} new F()");
        assert_eq!(err.message(), "F is not a constructor");
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(eval_str("null ?? 'd'"), "d");
        assert_eq!(eval_str("0 ?? 'd'"), "0");
        assert_eq!(eval_str("0 || 'd'"), "d");
        assert_eq!(eval_str("1 && 2"), "2");
    }

    #[test]
    fn test_compound_assignment_on_members() {
        assert_eq!(
            eval_str("const o = {n: 1}; o.n += 2; o['n'] *= 3; o.n"),
            "9"
        );
        assert_eq!(eval_str("const a = [1]; a[0]++; a[0]"), "2");
    }

    #[test]
    fn test_fresh_interpreter_has_no_previous_bindings() {
        let mut first = Interpreter::new(RunOptions::default());
        first.run("let leaked = 1").unwrap();
        let err = Interpreter::new(RunOptions::default())
            .run("leaked")
            .unwrap_err();
        assert_eq!(err.message(), "leaked is not defined");
    }

    #[test]
    fn test_top_level_return_is_syntax_error() {
        let err = eval_err("return 1");
        assert_eq!(err.message(), "Illegal return statement");
    }
}
