//! Tree-walking evaluator over [`crate::ast`].
//!
//! One `Interpreter` serves one run: it owns the global namespace, the
//! output buffer and the budget, and is dropped when the run ends.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use crate::ast::{
    BinOp, BoolOp, CmpOp, CompClause, CompElement, CompKind, Expr, FPart, Index, Stmt, StmtKind,
    Target,
};
use crate::builtins::{self, Builtin, collect_items};
use crate::error::{Fault, FaultKind};
use crate::format::{convert, format_value};
use crate::limits::{Budget, Limits};
use crate::methods;
use crate::ops::{binary_op, contains, ensure_len, unary_op};
use crate::subscript::{self, Selector};
use crate::value::{Function, Key, Value, compare, values_equal, values_identical};

type Scope = HashMap<Rc<str>, Value>;

/// String bytes copied or scanned per budget step.
const STR_BYTES_PER_STEP: usize = 64;

/// How a block finished.
#[derive(Debug)]
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

#[derive(Debug, Default)]
struct Frame {
    /// `None` for the module frame, which writes straight into globals.
    locals: Option<Scope>,
    declared_global: HashSet<Rc<str>>,
    comprehensions: Vec<Scope>,
}

impl Frame {
    fn function(locals: Scope) -> Self {
        Self {
            locals: Some(locals),
            ..Self::default()
        }
    }
}

pub(crate) struct Interpreter {
    globals: Scope,
    frames: Vec<Frame>,
    output: String,
    simulated_input: Rc<str>,
    limits: Limits,
    budget: Budget,
    eval_depth: usize,
}

impl Interpreter {
    pub(crate) fn new(limits: &Limits, simulated_input: &str) -> Self {
        Self {
            globals: Scope::new(),
            frames: vec![Frame::default()],
            output: String::new(),
            simulated_input: Rc::from(simulated_input),
            budget: Budget::start(limits),
            limits: limits.clone(),
            eval_depth: 0,
        }
    }

    /// Runs a parsed module to completion.
    ///
    /// # Errors
    ///
    /// Returns the first fault raised, attributed to its innermost line.
    pub(crate) fn run(&mut self, program: &[Stmt]) -> Result<(), Fault> {
        self.exec_block(program).map(|_| ())
    }

    pub(crate) fn into_output(self) -> String {
        self.output
    }

    pub(crate) fn steps(&self) -> u64 {
        self.budget.steps()
    }

    // ─── Hooks used by builtins and methods ────────────────────────────────

    pub(crate) fn tick(&mut self) -> Result<(), Fault> {
        self.budget.tick()
    }

    pub(crate) fn charge(&mut self, units: u64) -> Result<(), Fault> {
        self.budget.charge(units)
    }

    pub(crate) fn allocate(&mut self, elements: u64) -> Result<(), Fault> {
        self.budget.allocate(elements)
    }

    /// Bills a value freshly built by a bulk operation: containers count
    /// against the allocation budget, strings by bytes copied.
    pub(crate) fn charge_output(&mut self, value: &Value) -> Result<(), Fault> {
        match value {
            Value::List(_) | Value::Tuple(_) | Value::Dict(_) | Value::Set(_) => {
                self.budget.allocate(element_count(value))
            }
            Value::Str(_) => self.budget.charge(scan_cost(value)),
            _ => Ok(()),
        }
    }

    pub(crate) fn max_collection_len(&self) -> usize {
        self.limits.max_collection_len
    }

    pub(crate) fn simulated_input(&self) -> Rc<str> {
        Rc::clone(&self.simulated_input)
    }

    /// Appends to the captured output.
    pub(crate) fn write(&mut self, text: &str) -> Result<(), Fault> {
        if self.output.len() + text.len() > self.limits.max_output_bytes {
            return Err(Fault::new(
                FaultKind::MemoryError,
                format!(
                    "output exceeded the limit of {} bytes",
                    self.limits.max_output_bytes
                ),
            ));
        }
        self.output.push_str(text);
        Ok(())
    }

    pub(crate) fn call_value(
        &mut self,
        callee: &Value,
        positional: Vec<Value>,
        keywords: Vec<(Rc<str>, Value)>,
    ) -> Result<Value, Fault> {
        self.tick()?;
        match callee {
            Value::Function(function) => self.call_function(function, positional, keywords),
            Value::Builtin(builtin) => builtins::call(*builtin, self, positional, keywords),
            Value::Method(method) => methods::call(self, method, positional, keywords),
            other => Err(Fault::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    fn call_function(
        &mut self,
        function: &Rc<Function>,
        positional: Vec<Value>,
        keywords: Vec<(Rc<str>, Value)>,
    ) -> Result<Value, Fault> {
        let def = &function.def;
        if self.frames.len() > self.limits.max_call_depth {
            return Err(Fault::new(
                FaultKind::RecursionError,
                "maximum recursion depth exceeded",
            ));
        }

        let params = &def.params;
        if positional.len() > params.len() {
            let required = function.defaults.iter().filter(|d| d.is_none()).count();
            let accepted = if required == params.len() {
                params.len().to_string()
            } else {
                format!("from {required} to {}", params.len())
            };
            return Err(Fault::type_error(format!(
                "{}() takes {accepted} positional argument{} but {} {} given",
                def.name,
                if params.len() == 1 { "" } else { "s" },
                positional.len(),
                if positional.len() == 1 { "was" } else { "were" },
            )));
        }

        let mut slots: Vec<Option<Value>> = vec![None; params.len()];
        for (slot, value) in slots.iter_mut().zip(positional) {
            *slot = Some(value);
        }
        for (key, value) in keywords {
            let Some(idx) = params.iter().position(|param| param.name == key) else {
                return Err(Fault::type_error(format!(
                    "{}() got an unexpected keyword argument '{key}'",
                    def.name
                )));
            };
            if slots[idx].is_some() {
                return Err(Fault::type_error(format!(
                    "{}() got multiple values for argument '{key}'",
                    def.name
                )));
            }
            slots[idx] = Some(value);
        }

        let mut locals = Scope::new();
        let mut missing = Vec::new();
        for ((param, slot), default) in params.iter().zip(slots).zip(&function.defaults) {
            match slot.or_else(|| default.clone()) {
                Some(value) => {
                    locals.insert(Rc::clone(&param.name), value);
                }
                None => missing.push(format!("'{}'", param.name)),
            }
        }
        if !missing.is_empty() {
            return Err(Fault::type_error(format!(
                "{}() missing {} required positional argument{}: {}",
                def.name,
                missing.len(),
                if missing.len() == 1 { "" } else { "s" },
                join_names(&missing)
            )));
        }

        self.frames.push(Frame::function(locals));
        let flow = self.exec_block(&def.body);
        self.frames.pop();
        match flow? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::None),
        }
    }

    // ─── Names ─────────────────────────────────────────────────────────────

    fn load(&self, name: &Rc<str>) -> Result<Value, Fault> {
        if let Some(frame) = self.frames.last() {
            for scope in frame.comprehensions.iter().rev() {
                if let Some(value) = scope.get(name) {
                    return Ok(value.clone());
                }
            }
            if let Some(locals) = &frame.locals {
                if !frame.declared_global.contains(name) {
                    if let Some(value) = locals.get(name) {
                        return Ok(value.clone());
                    }
                }
            }
        }
        if let Some(value) = self.globals.get(name) {
            return Ok(value.clone());
        }
        Builtin::lookup(name)
            .map(Value::Builtin)
            .ok_or_else(|| name_error(name))
    }

    /// The namespace an assignment to `name` lands in.
    fn scope_for_write(&mut self, name: &str) -> &mut Scope {
        let Self {
            frames, globals, ..
        } = self;
        match frames.last_mut() {
            Some(Frame {
                locals: Some(locals),
                declared_global,
                ..
            }) if !declared_global.contains(name) => locals,
            _ => globals,
        }
    }

    fn store(&mut self, name: &Rc<str>, value: Value) {
        self.scope_for_write(name).insert(Rc::clone(name), value);
    }

    fn remove(&mut self, name: &Rc<str>) -> Result<(), Fault> {
        self.scope_for_write(name)
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| name_error(name))
    }

    fn comprehension_scopes(&mut self) -> Option<&mut Vec<Scope>> {
        self.frames.last_mut().map(|frame| &mut frame.comprehensions)
    }

    // ─── Statements ────────────────────────────────────────────────────────

    fn exec_block(&mut self, body: &[Stmt]) -> Result<Flow, Fault> {
        for stmt in body {
            self.tick().map_err(|fault| fault.at_line(stmt.line))?;
            let flow = self
                .exec_stmt(stmt)
                .map_err(|fault| fault.at_line(stmt.line))?;
            if !matches!(flow, Flow::Normal) {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, Fault> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
            StmtKind::Assign { targets, value } => {
                let value = self.eval(value)?;
                for target in targets {
                    self.assign(target, value.clone())?;
                }
            }
            StmtKind::AugAssign { target, op, value } => self.aug_assign(target, *op, value)?,
            StmtKind::If { branches, orelse } => {
                for (test, body) in branches {
                    if self.eval(test)?.truthy() {
                        return self.exec_block(body);
                    }
                }
                return self.exec_block(orelse);
            }
            StmtKind::While { test, body } => {
                while self.eval(test)?.truthy() {
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            StmtKind::For { target, iter, body } => {
                let iterable = self.eval(iter)?;
                self.charge(scan_cost(&iterable))?;
                for item in iterable.iter()? {
                    self.tick()?;
                    self.assign(target, item)?;
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            StmtKind::FunctionDef(def) => {
                let defaults = def
                    .params
                    .iter()
                    .map(|param| param.default.as_ref().map(|expr| self.eval(expr)).transpose())
                    .collect::<Result<Vec<_>, _>>()?;
                let function = Value::Function(Rc::new(Function {
                    def: Rc::clone(def),
                    defaults,
                }));
                self.store(&def.name, function);
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::Global(names) => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.declared_global.extend(names.iter().cloned());
                }
            }
            StmtKind::Del(targets) => {
                for target in targets {
                    self.delete(target)?;
                }
            }
            StmtKind::Assert { test, msg } => {
                if !self.eval(test)?.truthy() {
                    let message = match msg {
                        Some(expr) => self.eval(expr)?.to_str(),
                        None => String::new(),
                    };
                    return Err(Fault::new(FaultKind::AssertionError, message));
                }
            }
            StmtKind::Import(module) => {
                return Err(Fault::new(
                    FaultKind::ImportError,
                    format!("import of '{module}' is not allowed"),
                ));
            }
            StmtKind::Pass => {}
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
        }
        Ok(Flow::Normal)
    }

    fn selector(&mut self, index: &Index) -> Result<Selector, Fault> {
        match index {
            Index::Item(expr) => Ok(Selector::Item(self.eval(expr)?)),
            Index::Slice { lower, upper, step } => Ok(Selector::Slice {
                lower: self.slice_bound(lower.as_ref())?,
                upper: self.slice_bound(upper.as_ref())?,
                step: self.slice_bound(step.as_ref())?,
            }),
        }
    }

    fn slice_bound(&mut self, bound: Option<&Expr>) -> Result<Option<i64>, Fault> {
        let Some(expr) = bound else {
            return Ok(None);
        };
        match self.eval(expr)? {
            Value::None => Ok(None),
            value => value.as_int().map(Some).ok_or_else(|| {
                Fault::type_error("slice indices must be integers or None")
            }),
        }
    }

    fn assign(&mut self, target: &Target, value: Value) -> Result<(), Fault> {
        match target {
            Target::Name(name) => {
                self.store(name, value);
                Ok(())
            }
            Target::Subscript { object, index } => {
                let object = self.eval(object)?;
                let selector = self.selector(index)?;
                subscript::set(&object, &selector, value, self.limits.max_collection_len)
            }
            Target::Unpack(targets) => {
                let items = self.unpack(&value, targets.len())?;
                for (target, item) in targets.iter().zip(items) {
                    self.assign(target, item)?;
                }
                Ok(())
            }
        }
    }

    fn unpack(&mut self, value: &Value, expected: usize) -> Result<Vec<Value>, Fault> {
        if value.len().is_none() {
            return Err(Fault::type_error(format!(
                "cannot unpack non-iterable {} object",
                value.type_name()
            )));
        }
        let items = collect_items(self, value)?;
        match items.len() {
            got if got < expected => Err(Fault::value_error(format!(
                "not enough values to unpack (expected {expected}, got {got})"
            ))),
            got if got > expected => Err(Fault::value_error(format!(
                "too many values to unpack (expected {expected})"
            ))),
            _ => Ok(items),
        }
    }

    fn aug_assign(&mut self, target: &Target, op: BinOp, value: &Expr) -> Result<(), Fault> {
        let max = self.limits.max_collection_len;
        match target {
            Target::Name(name) => {
                let current = self.load(name)?;
                let operand = self.eval(value)?;
                let updated = self.in_place(op, current, &operand, max)?;
                self.store(name, updated);
                Ok(())
            }
            Target::Subscript { object, index } => {
                let object = self.eval(object)?;
                let selector = self.selector(index)?;
                let current = subscript::get(&object, &selector)?;
                let operand = self.eval(value)?;
                let updated = self.in_place(op, current, &operand, max)?;
                subscript::set(&object, &selector, updated, max)
            }
            Target::Unpack(_) => Err(Fault::syntax(
                "illegal expression for augmented assignment",
                0,
            )),
        }
    }

    /// `current op= operand`; lists extend in place.
    fn in_place(&mut self, op: BinOp, current: Value, operand: &Value, max: usize) -> Result<Value, Fault> {
        if let (BinOp::Add, Value::List(list)) = (op, &current) {
            let extra = collect_items(self, operand)?;
            let mut items = list.borrow_mut();
            ensure_len(items.len() + extra.len(), max)?;
            items.extend(extra);
            drop(items);
            return Ok(current);
        }
        let updated = binary_op(op, &current, operand, max)?;
        self.charge_output(&updated)?;
        Ok(updated)
    }

    fn delete(&mut self, target: &Target) -> Result<(), Fault> {
        match target {
            Target::Name(name) => self.remove(name),
            Target::Subscript { object, index } => {
                let object = self.eval(object)?;
                let selector = self.selector(index)?;
                subscript::delete(&object, &selector)
            }
            Target::Unpack(targets) => targets.iter().try_for_each(|target| self.delete(target)),
        }
    }

    // ─── Expressions ───────────────────────────────────────────────────────

    fn eval(&mut self, expr: &Expr) -> Result<Value, Fault> {
        self.eval_depth += 1;
        let result = if self.eval_depth > self.limits.max_eval_depth {
            Err(Fault::new(
                FaultKind::RecursionError,
                "maximum recursion depth exceeded",
            ))
        } else {
            self.eval_inner(expr)
        };
        self.eval_depth -= 1;
        result
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, Fault> {
        exprs.iter().map(|expr| self.eval(expr)).collect()
    }

    fn eval_inner(&mut self, expr: &Expr) -> Result<Value, Fault> {
        let max = self.limits.max_collection_len;
        match expr {
            Expr::None => Ok(Value::None),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(i) => Ok(Value::Int(*i)),
            Expr::Float(f) => Ok(Value::Float(*f)),
            Expr::Str(s) => Ok(Value::Str(Rc::clone(s))),
            Expr::FString(parts) => self.render(parts).map(Value::from),
            Expr::Name(name) => self.load(name),
            Expr::List(items) => Ok(Value::list(self.eval_all(items)?)),
            Expr::Tuple(items) => Ok(Value::tuple(self.eval_all(items)?)),
            Expr::Set(items) => {
                let mut set = IndexSet::new();
                for item in self.eval_all(items)? {
                    set.insert(Key::from_value(&item)?);
                }
                Ok(Value::set(set))
            }
            Expr::Dict(entries) => {
                let mut map = IndexMap::new();
                for (key, value) in entries {
                    let key = Key::from_value(&self.eval(key)?)?;
                    let value = self.eval(value)?;
                    map.insert(key, value);
                }
                Ok(Value::dict(map))
            }
            Expr::Comprehension {
                kind,
                element,
                clauses,
            } => self.comprehension(*kind, element, clauses),
            Expr::Subscript { object, index } => {
                let object = self.eval(object)?;
                let selector = self.selector(index)?;
                let value = subscript::get(&object, &selector)?;
                if matches!(selector, Selector::Slice { .. }) {
                    self.charge_output(&value)?;
                }
                Ok(value)
            }
            Expr::Attribute { object, name } => {
                let object = self.eval(object)?;
                methods::bind(&object, name)
            }
            Expr::Call { func, args, kwargs } => {
                let callee = self.eval(func)?;
                let positional = self.eval_all(args)?;
                let mut keywords = Vec::with_capacity(kwargs.len());
                for (key, value) in kwargs {
                    keywords.push((Rc::clone(key), self.eval(value)?));
                }
                self.call_value(&callee, positional, keywords)
            }
            Expr::Unary { op, operand } => unary_op(*op, &self.eval(operand)?),
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                let value = binary_op(*op, &left, &right, max)?;
                self.charge_output(&value)?;
                Ok(value)
            }
            Expr::BoolOp { op, left, right } => {
                let left = self.eval(left)?;
                match (op, left.truthy()) {
                    (BoolOp::And, false) | (BoolOp::Or, true) => Ok(left),
                    _ => self.eval(right),
                }
            }
            Expr::Compare { first, rest } => {
                let mut left = self.eval(first)?;
                for (op, right) in rest {
                    let right = self.eval(right)?;
                    self.charge(comparison_cost(*op, &left, &right))?;
                    if !compare_op(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::IfExp { test, body, orelse } => {
                if self.eval(test)?.truthy() {
                    self.eval(body)
                } else {
                    self.eval(orelse)
                }
            }
        }
    }

    fn render(&mut self, parts: &[FPart]) -> Result<String, Fault> {
        let mut out = String::new();
        for part in parts {
            match part {
                FPart::Literal(text) => out.push_str(text),
                FPart::Field {
                    expr,
                    conversion,
                    spec,
                } => {
                    let value = convert(self.eval(expr)?, *conversion);
                    let spec = self.render(spec)?;
                    out.push_str(&format_value(&value, &spec)?);
                }
            }
            ensure_len(out.len(), self.limits.max_collection_len)?;
        }
        Ok(out)
    }

    // ─── Comprehensions ────────────────────────────────────────────────────

    fn comprehension(
        &mut self,
        kind: CompKind,
        element: &CompElement,
        clauses: &[CompClause],
    ) -> Result<Value, Fault> {
        let mut sink = match kind {
            CompKind::List => Sink::List(Vec::new()),
            CompKind::Set => Sink::Set(IndexSet::new()),
            CompKind::Dict => Sink::Dict(IndexMap::new()),
        };
        if let Some(scopes) = self.comprehension_scopes() {
            scopes.push(Scope::new());
        }
        let result = self.comprehension_clause(element, clauses, &mut sink);
        if let Some(scopes) = self.comprehension_scopes() {
            scopes.pop();
        }
        result?;
        Ok(match sink {
            Sink::List(items) => Value::list(items),
            Sink::Set(items) => Value::set(items),
            Sink::Dict(entries) => Value::dict(entries),
        })
    }

    fn comprehension_clause(
        &mut self,
        element: &CompElement,
        clauses: &[CompClause],
        sink: &mut Sink,
    ) -> Result<(), Fault> {
        let Some((clause, rest)) = clauses.split_first() else {
            return self.emit(element, sink);
        };
        let iterable = self.eval(&clause.iter)?;
        self.charge(scan_cost(&iterable))?;
        'items: for item in iterable.iter()? {
            self.tick()?;
            self.bind_local(&clause.target, item)?;
            for condition in &clause.conditions {
                if !self.eval(condition)?.truthy() {
                    continue 'items;
                }
            }
            self.comprehension_clause(element, rest, sink)?;
        }
        Ok(())
    }

    fn emit(&mut self, element: &CompElement, sink: &mut Sink) -> Result<(), Fault> {
        let max = self.limits.max_collection_len;
        match (element, sink) {
            (CompElement::Single(expr), Sink::List(items)) => {
                let value = self.eval(expr)?;
                ensure_len(items.len() + 1, max)?;
                items.push(value);
            }
            (CompElement::Single(expr), Sink::Set(items)) => {
                let key = Key::from_value(&self.eval(expr)?)?;
                items.insert(key);
                ensure_len(items.len(), max)?;
            }
            (CompElement::Pair(key, value), Sink::Dict(entries)) => {
                let key = Key::from_value(&self.eval(key)?)?;
                let value = self.eval(value)?;
                entries.insert(key, value);
                ensure_len(entries.len(), max)?;
            }
            _ => {
                return Err(Fault::new(
                    FaultKind::InternalError,
                    "comprehension element does not match its kind",
                ));
            }
        }
        Ok(())
    }

    /// Binds a comprehension target in the innermost comprehension scope.
    fn bind_local(&mut self, target: &Target, value: Value) -> Result<(), Fault> {
        match target {
            Target::Name(name) => {
                if let Some(scope) = self.comprehension_scopes().and_then(|scopes| scopes.last_mut()) {
                    scope.insert(Rc::clone(name), value);
                }
                Ok(())
            }
            Target::Unpack(targets) => {
                let items = self.unpack(&value, targets.len())?;
                for (target, item) in targets.iter().zip(items) {
                    self.bind_local(target, item)?;
                }
                Ok(())
            }
            Target::Subscript { .. } => self.assign(target, value),
        }
    }
}

enum Sink {
    List(Vec<Value>),
    Set(IndexSet<Key>),
    Dict(IndexMap<Key, Value>),
}

fn name_error(name: &str) -> Fault {
    Fault::new(
        FaultKind::NameError,
        format!("name '{name}' is not defined"),
    )
}

fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} and {second}"),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    }
}

fn element_count(value: &Value) -> u64 {
    value.len().map_or(0, |len| u64::try_from(len).unwrap_or(u64::MAX))
}

/// Steps billed for walking `value` once; ranges iterate lazily and cost
/// nothing up front.
pub(crate) fn scan_cost(value: &Value) -> u64 {
    match value {
        Value::Str(s) => u64::try_from(s.len() / STR_BYTES_PER_STEP).unwrap_or(u64::MAX),
        Value::Range { .. } => 0,
        other => element_count(other),
    }
}

/// Steps billed for a comparison that may walk a sequence.
fn comparison_cost(op: CmpOp, left: &Value, right: &Value) -> u64 {
    let sequential = |value: &Value| match value {
        Value::Str(_) | Value::List(_) | Value::Tuple(_) => scan_cost(value),
        _ => 0,
    };
    match op {
        CmpOp::In | CmpOp::NotIn => sequential(right),
        CmpOp::Is | CmpOp::IsNot => 0,
        _ => sequential(left).min(sequential(right)),
    }
}

fn compare_op(op: CmpOp, left: &Value, right: &Value) -> Result<bool, Fault> {
    use std::cmp::Ordering;

    let ordered = |symbol: &str, accept: fn(Ordering) -> bool| {
        compare(left, right, symbol).map(|ordering| ordering.is_some_and(accept))
    };
    match op {
        CmpOp::Eq => values_equal(left, right),
        CmpOp::NotEq => values_equal(left, right).map(|equal| !equal),
        CmpOp::Lt => ordered("<", Ordering::is_lt),
        CmpOp::LtE => ordered("<=", Ordering::is_le),
        CmpOp::Gt => ordered(">", Ordering::is_gt),
        CmpOp::GtE => ordered(">=", Ordering::is_ge),
        CmpOp::In => contains(right, left),
        CmpOp::NotIn => contains(right, left).map(|found| !found),
        CmpOp::Is => Ok(values_identical(left, right)),
        CmpOp::IsNot => Ok(!values_identical(left, right)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run(source: &str) -> Result<String, Fault> {
        let program = parse(source)?;
        let mut interp = Interpreter::new(&Limits::default(), "");
        interp.run(&program)?;
        Ok(interp.into_output())
    }

    #[test]
    fn functions_defaults_and_keywords() {
        let out = run("def f(a, b=2, c=3):\n    return a + b * c\nprint(f(1), f(1, c=10), f(a=0, b=0))\n")
            .unwrap();
        assert_eq!(out, "7 21 0\n");
    }

    #[test]
    fn argument_errors_read_like_python() {
        let err = run("def f(a, b):\n    pass\nf(1)\n").unwrap_err();
        assert_eq!(err.message(), "f() missing 1 required positional argument: 'b'");
        let err = run("def f(a):\n    pass\nf(1, 2)\n").unwrap_err();
        assert_eq!(err.message(), "f() takes 1 positional argument but 2 were given");
        let err = run("def f(a):\n    pass\nf(b=1)\n").unwrap_err();
        assert_eq!(err.message(), "f() got an unexpected keyword argument 'b'");
    }

    #[test]
    fn globals_are_shared_only_when_declared() {
        let source = "n = 1\ndef bump():\n    global n\n    n += 1\ndef shadow():\n    n = 100\nbump()\nshadow()\nprint(n)\n";
        assert_eq!(run(source).unwrap(), "2\n");
    }

    #[test]
    fn comprehension_targets_do_not_leak() {
        let err = run("xs = [i * i for i in range(3)]\nprint(i)\n").unwrap_err();
        assert_eq!(err.kind(), FaultKind::NameError);
        assert_eq!(err.line(), Some(2));
        let out = run("print({k: v for k, v in [('a', 1), ('b', 2)] if v > 1})\n").unwrap();
        assert_eq!(out, "{'b': 2}\n");
    }

    #[test]
    fn list_plus_equals_mutates_in_place() {
        let out = run("a = [1]\nb = a\na += [2]\nprint(b)\n").unwrap();
        assert_eq!(out, "[1, 2]\n");
    }

    #[test]
    fn loops_break_and_continue() {
        let source = "total = 0\nfor i in range(10):\n    if i % 2:\n        continue\n    if i > 6:\n        break\n    total += i\nprint(total)\n";
        assert_eq!(run(source).unwrap(), "12\n");
    }

    #[test]
    fn chained_comparison_short_circuits() {
        assert_eq!(run("print(1 < 2 < 3, 1 < 3 < 2, 'a' in 'cat')\n").unwrap(), "True False True\n");
    }

    #[test]
    fn faults_carry_the_innermost_line() {
        let err = run("def f():\n    return 1 / 0\n\nf()\n").unwrap_err();
        assert_eq!(err.kind(), FaultKind::ZeroDivisionError);
        assert_eq!(err.line(), Some(2));
    }

    /// Runs on a thread with the stack the sandbox gives its interpreter.
    fn run_on_sandbox_stack(source: &'static str) -> Result<String, Fault> {
        std::thread::Builder::new()
            .stack_size(Limits::default().stack_size)
            .spawn(move || run(source))
            .unwrap()
            .join()
            .unwrap()
    }

    #[test]
    fn recursion_is_bounded() {
        let err = run_on_sandbox_stack("def f(n):\n    return f(n + 1)\nf(0)\n").unwrap_err();
        assert_eq!(err.kind(), FaultKind::RecursionError);
    }

    #[test]
    fn bulk_operations_are_billed() {
        let program = parse("x = [0] * 5000\ny = x + x[:10]\n").unwrap();
        let mut interp = Interpreter::new(&Limits::default(), "");
        interp.run(&program).unwrap();
        assert!(interp.steps() >= 10_010, "{}", interp.steps());

        let program = parse("for i in range(10):\n    x = [0] * 1000\n").unwrap();
        let mut interp = Interpreter::new(&Limits::default().with_max_allocated(5_000), "");
        let err = interp.run(&program).unwrap_err();
        assert_eq!(err.kind(), FaultKind::MemoryError);
    }

    #[test]
    fn unpacking_checks_arity() {
        let err = run("a, b = [1, 2, 3]\n").unwrap_err();
        assert_eq!(err.message(), "too many values to unpack (expected 2)");
        assert_eq!(run("a, (b, c) = 1, [2, 3]\nprint(a + b + c)\n").unwrap(), "6\n");
    }

    #[test]
    fn del_and_assert() {
        let err = run("x = 1\ndel x\nprint(x)\n").unwrap_err();
        assert_eq!(err.kind(), FaultKind::NameError);
        let err = run("assert 1 == 2, 'math'\n").unwrap_err();
        assert_eq!(err.kind(), FaultKind::AssertionError);
        assert_eq!(err.message(), "math");
    }

    #[test]
    fn output_is_capped() {
        let limits = Limits::default().with_max_output_bytes(16);
        let program = parse("while True:\n    print('spam')\n").unwrap();
        let mut interp = Interpreter::new(&limits, "");
        let err = interp.run(&program).unwrap_err();
        assert_eq!(err.kind(), FaultKind::MemoryError);
        assert_eq!(interp.into_output(), "spam\nspam\nspam\n");
    }

    #[test]
    fn sort_with_key_and_reverse() {
        let source = "words = ['bb', 'a', 'ccc', 'dd']\nwords.sort(key=len, reverse=True)\nprint(words)\n";
        assert_eq!(run(source).unwrap(), "['ccc', 'bb', 'dd', 'a']\n");
    }
}
