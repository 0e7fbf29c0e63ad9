//! JavaScript generation.
//!
//! Compilation runs in two passes, the same way the runtime's reference
//! compiler does. [`check`] walks the tree in source order, rejecting helper
//! calls the options do not allow and noting which runtime features the
//! template needs. [`JavaScriptCompiler`] then emits one function per program,
//! compiling nested programs before the program that refers to them. Helper
//! lookups therefore reach the [`NameLookup`] in that order: innermost block
//! bodies first, and within a statement arguments before the helper itself.

use std::collections::VecDeque;

use crate::ast::{Block, Call, Expr, Hash, Partial, PathExpr, Program, Statement};
use crate::name_lookup::{LookupKind, NameLookup, quoted_string};
use crate::{CompileError, PrecompileOptions, SourceLocation};

pub const COMPILER_REVISION: u32 = 8;
pub const COMPILER_VERSION: &str = ">= 4.3.0";

const CALL_CONTEXT: &str = "depth0 != null ? depth0 : (container.nullContext || {})";

const LOOKUP_PROPERTY: &str = "lookupProperty = container.lookupProperty || function(parent, propertyName) {
        if (Object.prototype.hasOwnProperty.call(parent, propertyName)) {
          return parent[propertyName];
        }
        return undefined
    }";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    /// A plain value lookup.
    Simple,
    Helper,
    /// A bare name that may be a helper or a context property; decided at render time.
    Ambiguous,
}

/// Runtime features a template relies on, recorded in the template spec.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Features {
    pub use_partials: bool,
    pub use_data: bool,
    pub use_depths: bool,
    pub use_block_params: bool,
}

/// Block parameter names in scope, one entry per enclosing program.
#[derive(Debug, Default)]
struct BlockParamScopes(Vec<Vec<String>>);

impl BlockParamScopes {
    fn push(&mut self, names: &[String]) {
        self.0.push(names.to_vec());
    }

    fn pop(&mut self) {
        self.0.pop();
    }

    /// `(depth, index)` of `name`, with depth 0 being the innermost program.
    fn position(&self, name: &str) -> Option<(usize, usize)> {
        self.0.iter().rev().enumerate().find_map(|(depth, names)| {
            names
                .iter()
                .position(|candidate| candidate == name)
                .map(|ix| (depth, ix))
        })
    }
}

fn classify(
    call: &Call,
    is_subexpr: bool,
    options: &PrecompileOptions,
    scopes: &BlockParamScopes,
) -> CallKind {
    let path = &call.path;
    let is_simple = path.is_simple_id();
    let is_block_param = is_simple && scopes.position(path.head()).is_some();
    let mut is_helper =
        !is_block_param && (is_subexpr || !call.params.is_empty() || call.hash.is_some());
    let mut is_eligible = !is_block_param && (is_helper || is_simple);

    if is_eligible && !is_helper {
        if options.is_known_helper(path.head()) {
            is_helper = true;
        } else if options.known_helpers_only {
            is_eligible = false;
        }
    }

    if is_helper {
        CallKind::Helper
    } else if is_eligible {
        CallKind::Ambiguous
    } else {
        CallKind::Simple
    }
}

fn unknown_helper(call: &Call) -> CompileError {
    CompileError::semantic(
        format!(
            "You specified knownHelpersOnly, but used the unknown helper {}",
            call.path.head()
        ),
        call.location,
    )
}

/// First pass: validates helper usage and collects [`Features`].
pub(crate) fn check(
    program: &Program,
    options: &PrecompileOptions,
) -> Result<Features, CompileError> {
    let mut checker = Checker {
        options,
        scopes: BlockParamScopes::default(),
        features: Features {
            use_data: options.data,
            ..Features::default()
        },
    };
    checker.program(program)?;
    Ok(checker.features)
}

struct Checker<'a> {
    options: &'a PrecompileOptions,
    scopes: BlockParamScopes,
    features: Features,
}

impl Checker<'_> {
    fn program(&mut self, program: &Program) -> Result<(), CompileError> {
        if !program.block_params.is_empty() {
            self.features.use_block_params = true;
        }
        self.scopes.push(&program.block_params);
        let result = program
            .body
            .iter()
            .try_for_each(|statement| self.statement(statement));
        self.scopes.pop();
        result
    }

    fn statement(&mut self, statement: &Statement) -> Result<(), CompileError> {
        match statement {
            Statement::Content(_) => Ok(()),
            Statement::Mustache(mustache) => self.call(&mustache.call, false),
            Statement::Block(block) => {
                if let Some(program) = &block.program {
                    self.program(program)?;
                }
                if let Some(inverse) = &block.inverse {
                    self.program(inverse)?;
                }
                self.call(&block.call, false)
            }
            Statement::Partial(partial) => {
                self.features.use_partials = true;
                self.arguments(&partial.params, partial.hash.as_ref())
            }
        }
    }

    fn call(&mut self, call: &Call, is_subexpr: bool) -> Result<(), CompileError> {
        match classify(call, is_subexpr, self.options, &self.scopes) {
            CallKind::Helper => {
                self.arguments(&call.params, call.hash.as_ref())?;
                if !self.options.is_known_helper(call.path.head()) {
                    if self.options.known_helpers_only {
                        return Err(unknown_helper(call));
                    }
                    self.path(&call.path);
                }
            }
            CallKind::Simple | CallKind::Ambiguous => self.path(&call.path),
        }
        Ok(())
    }

    fn arguments(&mut self, params: &[Expr], hash: Option<&Hash>) -> Result<(), CompileError> {
        let hash_values = hash
            .into_iter()
            .flat_map(|hash| hash.pairs.iter().map(|(_, value)| value));
        for expr in params.iter().chain(hash_values) {
            match expr {
                Expr::Path(path) => self.path(path),
                Expr::SubExpr(call) => self.call(call, true)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn path(&mut self, path: &PathExpr) {
        if path.depth > 0 {
            self.features.use_depths = true;
        }
        if path.data {
            self.features.use_data = true;
        }
    }
}

/// A compiled child program, referenced from its parent through `container.program`.
#[derive(Debug, Clone, Copy)]
struct ChildProgram {
    index: usize,
    block_params: usize,
}

/// How the segments of one path are read.
#[derive(Debug, Clone, Copy)]
struct PathRead {
    kind: LookupKind,
    /// Guard segments with `&&` instead of `!= null`.
    falsy: bool,
    /// Throw on a missing last segment when the `strict` option is on.
    strict: bool,
    location: SourceLocation,
}

/// Per-function bookkeeping for variable declarations.
#[derive(Default)]
struct FunctionState {
    uses_stack: bool,
    uses_helper: bool,
    uses_lookup_property: bool,
    /// Compiled `(program, inverse)` of each block in the body, in order.
    children: VecDeque<(Option<ChildProgram>, Option<ChildProgram>)>,
}

struct Part {
    code: String,
    is_string: bool,
}

/// Second pass: emits the template spec object literal.
pub(crate) struct JavaScriptCompiler<'a> {
    options: &'a PrecompileOptions,
    lookup: &'a mut dyn NameLookup,
    features: Features,
    scopes: BlockParamScopes,
    /// Compiled programs by index. Index 0 is never used, and a slot is reserved
    /// before a program's own children are compiled.
    programs: Vec<Option<String>>,
}

impl<'a> JavaScriptCompiler<'a> {
    pub fn new(
        options: &'a PrecompileOptions,
        features: Features,
        lookup: &'a mut dyn NameLookup,
    ) -> Self {
        Self {
            options,
            lookup,
            features,
            scopes: BlockParamScopes::default(),
            programs: Vec::new(),
        }
    }

    pub fn compile(mut self, program: &Program) -> Result<String, CompileError> {
        let main = self.function(program)?;

        let mut members: Vec<String> = self
            .programs
            .iter()
            .enumerate()
            .filter_map(|(index, source)| {
                source
                    .as_ref()
                    .map(|source| format!("\"{index}\":{source}"))
            })
            .collect();
        members.push(format!(
            "\"compiler\":[{COMPILER_REVISION},{}]",
            quoted_string(COMPILER_VERSION)
        ));
        members.push(format!("\"main\":{main}"));
        let flags = [
            ("usePartial", self.features.use_partials),
            ("useData", self.features.use_data),
            ("useDepths", self.features.use_depths),
            ("useBlockParams", self.features.use_block_params),
        ];
        members.extend(
            flags
                .into_iter()
                .filter(|(_, enabled)| *enabled)
                .map(|(flag, _)| format!("\"{flag}\":true")),
        );
        Ok(format!("{{{}}}", members.join(",")))
    }

    fn child(&mut self, program: &Program) -> Result<ChildProgram, CompileError> {
        self.programs.push(None);
        let index = self.programs.len();
        let source = self.function(program)?;
        if self.programs.len() <= index {
            self.programs.resize(index + 1, None);
        }
        self.programs[index] = Some(source);
        Ok(ChildProgram {
            index,
            block_params: program.block_params.len(),
        })
    }

    fn function(&mut self, program: &Program) -> Result<String, CompileError> {
        self.scopes.push(&program.block_params);
        let result = self.function_body(program);
        self.scopes.pop();
        result
    }

    fn function_body(&mut self, program: &Program) -> Result<String, CompileError> {
        let mut state = FunctionState::default();
        for statement in &program.body {
            if let Statement::Block(block) = statement {
                let program = block.program.as_ref().map(|p| self.child(p)).transpose()?;
                let inverse = block.inverse.as_ref().map(|p| self.child(p)).transpose()?;
                state.children.push_back((program, inverse));
            }
        }

        let mut parts = Vec::new();
        let mut pending_content = String::new();
        for statement in &program.body {
            if let Statement::Content(text) = statement {
                pending_content.push_str(text);
                continue;
            }
            if !pending_content.is_empty() {
                parts.push(Part {
                    code: quoted_string(&std::mem::take(&mut pending_content)),
                    is_string: true,
                });
            }
            parts.push(match statement {
                Statement::Mustache(mustache) => {
                    let value = self.call(&mustache.call, false, &mut state)?;
                    if mustache.escaped && !self.options.no_escape {
                        Part {
                            code: format!("container.escapeExpression({value})"),
                            is_string: true,
                        }
                    } else {
                        Part {
                            code: append(value, &mut state),
                            is_string: false,
                        }
                    }
                }
                Statement::Block(block) => {
                    let (program, inverse) = state.children.pop_front().unwrap_or_default();
                    let value = self.block(block, program, inverse, &mut state)?;
                    Part {
                        code: append(value, &mut state),
                        is_string: false,
                    }
                }
                Statement::Partial(partial) => {
                    let value = self.partial(partial, &mut state)?;
                    Part {
                        code: append(value, &mut state),
                        is_string: false,
                    }
                }
                Statement::Content(_) => continue,
            });
        }
        if !pending_content.is_empty() {
            parts.push(Part {
                code: quoted_string(&pending_content),
                is_string: true,
            });
        }

        Ok(self.render_function(parts, &state))
    }

    fn render_function(&self, parts: Vec<Part>, state: &FunctionState) -> String {
        let mut params = String::from("container,depth0,helpers,partials,data");
        if self.features.use_block_params || self.features.use_depths {
            params.push_str(",blockParams");
        }
        if self.features.use_depths {
            params.push_str(",depths");
        }

        let mut vars = Vec::new();
        if state.uses_stack {
            vars.push("stack1");
        }
        if state.uses_helper {
            vars.push("helper");
        }
        if state.uses_lookup_property {
            vars.push(LOOKUP_PROPERTY);
        }

        // Two leading non-string values would be added numerically.
        let coerce = match parts.as_slice() {
            [first, second, ..] => !first.is_string && !second.is_string,
            _ => false,
        };
        let mut codes: Vec<String> = parts.into_iter().map(|part| part.code).collect();
        if coerce {
            codes.insert(0, "\"\"".to_string());
        }
        if codes.is_empty() {
            codes.push("\"\"".to_string());
        }

        let mut function = format!("function({params}) {{\n");
        if !vars.is_empty() {
            function.push_str(&format!("    var {};\n\n", vars.join(", ")));
        }
        function.push_str(&format!("  return {};\n}}", codes.join("\n    + ")));
        function
    }

    fn lookup(
        &mut self,
        parent: &str,
        name: &str,
        kind: LookupKind,
        state: &mut FunctionState,
    ) -> String {
        state.uses_lookup_property = true;
        self.lookup.name_lookup(parent, name, kind)
    }

    fn program_expr(&self, child: Option<ChildProgram>) -> Option<String> {
        let child = child?;
        let mut args = format!("{}, data, {}", child.index, child.block_params);
        if self.features.use_block_params || self.features.use_depths {
            args.push_str(", blockParams");
        }
        if self.features.use_depths {
            args.push_str(", depths");
        }
        Some(format!("container.program({args})"))
    }

    fn helper_options(
        &self,
        name: &str,
        hash: String,
        program: Option<ChildProgram>,
        inverse: Option<ChildProgram>,
        location: SourceLocation,
    ) -> String {
        let mut pairs = vec![("name", quoted_string(name)), ("hash", hash)];
        if program.is_some() || inverse.is_some() {
            let noop = || "container.noop".to_string();
            pairs.push(("fn", self.program_expr(program).unwrap_or_else(noop)));
            pairs.push(("inverse", self.program_expr(inverse).unwrap_or_else(noop)));
        }
        if self.features.use_data {
            pairs.push(("data", "data".into()));
        }
        if self.features.use_block_params {
            pairs.push(("blockParams", "blockParams".into()));
        }
        pairs.push(("loc", location.to_json()));
        object_literal(pairs)
    }

    fn hash_literal(
        &mut self,
        hash: Option<&Hash>,
        state: &mut FunctionState,
    ) -> Result<String, CompileError> {
        let mut pairs = Vec::new();
        for (key, value) in hash.into_iter().flat_map(|hash| &hash.pairs) {
            pairs.push(format!("{}:{}", quoted_string(key), self.expr(value, state)?));
        }
        Ok(format!("{{{}}}", pairs.join(",")))
    }

    fn call(
        &mut self,
        call: &Call,
        is_subexpr: bool,
        state: &mut FunctionState,
    ) -> Result<String, CompileError> {
        match classify(call, is_subexpr, self.options, &self.scopes) {
            CallKind::Simple => Ok(self.simple_value(call, state)),
            CallKind::Helper => self.helper_call(call, None, None, state),
            CallKind::Ambiguous => Ok(self.ambiguous_call(call, None, None, state).0),
        }
    }

    fn block(
        &mut self,
        block: &Block,
        program: Option<ChildProgram>,
        inverse: Option<ChildProgram>,
        state: &mut FunctionState,
    ) -> Result<String, CompileError> {
        let call = &block.call;
        match classify(call, false, self.options, &self.scopes) {
            CallKind::Helper => self.helper_call(call, program, inverse, state),
            CallKind::Simple => {
                let value = self.simple_value(call, state);
                let options = self.helper_options(
                    &call.path.original,
                    "{}".into(),
                    program,
                    inverse,
                    call.location,
                );
                Ok(format!(
                    "container.hooks.blockHelperMissing.call(depth0,{value},{options})"
                ))
            }
            CallKind::Ambiguous => {
                let (value, helper) = self.ambiguous_call(call, program, inverse, state);
                let options = self.helper_options("", "{}".into(), program, inverse, call.location);
                state.uses_stack = true;
                Ok(format!(
                    "((stack1 = {value}),({helper} ? stack1 : container.hooks.blockHelperMissing.call(depth0,stack1,{options})))"
                ))
            }
        }
    }

    fn simple_value(&mut self, call: &Call, state: &mut FunctionState) -> String {
        let value = self.path_value(&call.path, false, true, state);
        format!("container.lambda({value}, depth0)")
    }

    fn helper_call(
        &mut self,
        call: &Call,
        program: Option<ChildProgram>,
        inverse: Option<ChildProgram>,
        state: &mut FunctionState,
    ) -> Result<String, CompileError> {
        let mut args = vec![CALL_CONTEXT.to_string()];
        for param in &call.params {
            args.push(self.expr(param, state)?);
        }
        let hash = self.hash_literal(call.hash.as_ref(), state)?;
        let name = call.path.head();
        args.push(self.helper_options(name, hash, program, inverse, call.location));
        let args = args.join(",");

        if self.options.is_known_helper(name) {
            let helper = self.lookup("helpers", name, LookupKind::Helper, state);
            return Ok(format!("{helper}.call({args})"));
        }
        if self.options.known_helpers_only {
            return Err(unknown_helper(call));
        }

        let non_helper = self.path_value(&call.path, true, true, state);
        let helper = self.lookup("helpers", &call.path.original, LookupKind::Helper, state);
        let mut candidates = Vec::new();
        if call.path.is_simple_id() {
            candidates.push(helper);
        }
        candidates.push(non_helper);
        if !self.options.strict {
            candidates.push("container.hooks.helperMissing".to_string());
        }
        Ok(format!("({}).call({args})", candidates.join(" || ")))
    }

    /// Returns the call expression and the helper lookup it tested.
    fn ambiguous_call(
        &mut self,
        call: &Call,
        program: Option<ChildProgram>,
        inverse: Option<ChildProgram>,
        state: &mut FunctionState,
    ) -> (String, String) {
        let non_helper = self.path_value(&call.path, false, true, state);
        let name = call.path.head();
        let options = self.helper_options(name, "{}".into(), program, inverse, call.location);
        let helper = self.lookup("helpers", name, LookupKind::Helper, state);
        state.uses_helper = true;

        let lookup = if self.options.strict {
            format!("(helper = {helper} || {non_helper})")
        } else {
            format!(
                "(helper = (helper = {helper} || {non_helper}) != null ? helper : container.hooks.helperMissing)"
            )
        };
        (
            format!(
                "({lookup},(typeof helper === \"function\" ? helper.call({CALL_CONTEXT},{options}) : helper))"
            ),
            helper,
        )
    }

    fn partial(
        &mut self,
        partial: &Partial,
        state: &mut FunctionState,
    ) -> Result<String, CompileError> {
        let context = match partial.params.first() {
            Some(param) => self.expr(param, state)?,
            None if self.options.explicit_partial_context => "undefined".to_string(),
            None => "depth0".to_string(),
        };

        let mut pairs = vec![("name", quoted_string(&partial.name))];
        if partial.hash.is_some() {
            pairs.push(("hash", self.hash_literal(partial.hash.as_ref(), state)?));
        }
        if self.features.use_data {
            pairs.push(("data", "data".into()));
        }
        if self.features.use_block_params {
            pairs.push(("blockParams", "blockParams".into()));
        }
        if !partial.indent.is_empty() {
            pairs.push(("indent", quoted_string(&partial.indent)));
        }
        pairs.push(("helpers", "helpers".into()));
        pairs.push(("partials", "partials".into()));
        pairs.push(("decorators", "container.decorators".into()));

        let lookup = self.lookup("partials", &partial.name, LookupKind::Partial, state);
        Ok(format!(
            "container.invokePartial({lookup},{context},{})",
            object_literal(pairs)
        ))
    }

    fn expr(&mut self, expr: &Expr, state: &mut FunctionState) -> Result<String, CompileError> {
        Ok(match expr {
            Expr::Path(path) => self.path_value(path, false, false, state),
            Expr::SubExpr(call) => self.call(call, true, state)?,
            Expr::String(value) => quoted_string(value),
            Expr::Number(value) => value.clone(),
            Expr::Boolean(value) => value.to_string(),
            Expr::Null => "null".to_string(),
            Expr::Undefined => "undefined".to_string(),
        })
    }

    /// Reads a path; see [`PathRead`] for `falsy` and `strict`.
    fn path_value(
        &mut self,
        path: &PathExpr,
        falsy: bool,
        strict: bool,
        state: &mut FunctionState,
    ) -> String {
        let read = PathRead {
            kind: LookupKind::Context,
            falsy,
            strict,
            location: path.location,
        };
        let block_param = path
            .parts
            .first()
            .filter(|_| path.depth == 0 && !path.is_scoped())
            .and_then(|head| self.scopes.position(head));
        if let Some((depth, ix)) = block_param {
            let base = format!("blockParams[{depth}][{ix}]");
            let read = PathRead {
                falsy: false,
                strict: false,
                ..read
            };
            return self.resolve_path(base, &path.parts[1..], read, state);
        }
        if path.parts.is_empty() {
            return self.context_name(path.depth);
        }
        if path.data {
            let base = match path.depth {
                0 => "data".to_string(),
                depth => format!("container.data(data, {depth})"),
            };
            let read = PathRead {
                kind: LookupKind::Data,
                falsy: true,
                ..read
            };
            return self.resolve_path(base, &path.parts, read, state);
        }
        let base = self.context_name(path.depth);
        self.resolve_path(base, &path.parts, read, state)
    }

    fn context_name(&self, depth: usize) -> String {
        if self.features.use_depths && depth > 0 {
            format!("depths[{depth}]")
        } else {
            format!("depth{depth}")
        }
    }

    fn resolve_path(
        &mut self,
        base: String,
        parts: &[String],
        read: PathRead,
        state: &mut FunctionState,
    ) -> String {
        if self.options.strict || self.options.assume_objects {
            let terminal = (self.options.strict && read.strict)
                .then(|| parts.split_last())
                .flatten();
            let walked = terminal.map_or(parts, |(_, init)| init);
            let mut value = base;
            for part in walked {
                value = self.lookup(&value, part, read.kind, state);
            }
            return match terminal {
                Some((last, _)) => format!(
                    "container.strict({value}, {}, {})",
                    quoted_string(last),
                    read.location.to_json()
                ),
                None => value,
            };
        }

        let mut value = base;
        for (ix, part) in parts.iter().enumerate() {
            let (target, assigned) = if ix == 0 {
                (value.clone(), value)
            } else {
                state.uses_stack = true;
                ("stack1".to_string(), format!("(stack1 = {value})"))
            };
            let lookup = self.lookup(&target, part, read.kind, state);
            value = if read.falsy {
                format!("({assigned} && {lookup})")
            } else {
                format!("({assigned} != null ? {lookup} : {target})")
            };
        }
        value
    }
}

fn append(value: String, state: &mut FunctionState) -> String {
    state.uses_stack = true;
    format!("((stack1 = {value}) != null ? stack1 : \"\")")
}

fn object_literal(pairs: Vec<(&str, String)>) -> String {
    let members: Vec<String> = pairs
        .into_iter()
        .map(|(key, value)| format!("{}:{value}", quoted_string(key)))
        .collect();
    format!("{{{}}}", members.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DefaultNameLookup, parse};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn compile(source: &str, options: &PrecompileOptions) -> Result<String, CompileError> {
        let program = parse(source)?;
        let features = check(&program, options)?;
        JavaScriptCompiler::new(options, features, &mut DefaultNameLookup)
            .compile(&program)
    }

    fn known(names: &[&str]) -> PrecompileOptions {
        PrecompileOptions {
            known_helpers: names.iter().map(|name| (name.to_string(), true)).collect(),
            known_helpers_only: true,
            ..PrecompileOptions::default()
        }
    }

    #[test]
    fn test_content_only_template() {
        assert_eq!(
            compile("Hello\n", &PrecompileOptions::default()).unwrap(),
            "{\"compiler\":[8,\">= 4.3.0\"],\"main\":function(container,depth0,helpers,partials,data) {\n  return \"Hello\\n\";\n},\"useData\":true}"
        );
        assert!(
            compile("", &PrecompileOptions::default())
                .unwrap()
                .contains("  return \"\";\n}")
        );
    }

    #[test]
    fn test_known_helper_call() {
        let spec = compile("Hello {{foo name}}", &known(&["foo"])).unwrap();
        let expected_main = indoc! {r#"
            function(container,depth0,helpers,partials,data) {
                var lookupProperty = container.lookupProperty || function(parent, propertyName) {
                    if (Object.prototype.hasOwnProperty.call(parent, propertyName)) {
                      return parent[propertyName];
                    }
                    return undefined
                };

              return "Hello "
                + container.escapeExpression(lookupProperty(helpers,"foo").call(depth0 != null ? depth0 : (container.nullContext || {}),(depth0 != null ? lookupProperty(depth0,"name") : depth0),{"name":"foo","hash":{},"data":data,"loc":{"start":{"line":1,"column":6},"end":{"line":1,"column":18}}}));
            }"#};
        assert_eq!(
            spec,
            format!("{{\"compiler\":[8,\">= 4.3.0\"],\"main\":{expected_main},\"useData\":true}}")
        );
    }

    #[test]
    fn test_unknown_helper_is_rejected() {
        let error = compile("Hello {{foo name}}", &known(&[])).unwrap_err();
        assert_eq!(
            error.to_string(),
            "You specified knownHelpersOnly, but used the unknown helper foo - 1:6"
        );

        let source = "{{#if a}}\n  {{bar (baz 1)}}\n{{/if}}";
        let error = compile(source, &known(&["bar"])).unwrap_err();
        assert_eq!(
            error.to_string(),
            "You specified knownHelpersOnly, but used the unknown helper baz - 2:8"
        );
    }

    #[test]
    fn test_bare_names_are_values_under_known_helpers_only() {
        let spec = compile("{{title}}", &known(&[])).unwrap();
        assert!(spec.contains(
            "container.escapeExpression(container.lambda((depth0 != null ? lookupProperty(depth0,\"title\") : depth0), depth0))"
        ));
        assert!(!spec.contains("helperMissing"));
    }

    #[test]
    fn test_ambiguous_mustache() {
        let spec = compile("{{title}}", &PrecompileOptions::default()).unwrap();
        assert!(spec.contains("var helper, lookupProperty"));
        assert!(spec.contains(
            "((helper = (helper = lookupProperty(helpers,\"title\") || (depth0 != null ? lookupProperty(depth0,\"title\") : depth0)) != null ? helper : container.hooks.helperMissing),(typeof helper === \"function\" ? helper.call(depth0 != null ? depth0 : (container.nullContext || {}),{\"name\":\"title\",\"hash\":{},\"data\":data,\"loc\":"
        ));
    }

    #[test]
    fn test_block_programs_are_numbered_children_first() {
        let source = indoc! {"
            {{#each items}}
              {{#if active}}{{name}}{{/if}}
            {{else}}
              none
            {{/each}}
        "};
        let spec = compile(source, &known(&[])).unwrap();
        let each = spec.find("\"1\":function").unwrap();
        let nested_if = spec.find("\"2\":function").unwrap();
        let each_inverse = spec.find("\"4\":function").unwrap();
        let main = spec.find("\"main\":function").unwrap();
        assert!(each < nested_if && nested_if < each_inverse && each_inverse < main);
        assert!(!spec.contains("\"3\":"));
        assert!(spec.contains("\"fn\":container.program(2, data, 0),\"inverse\":container.noop"));
        assert!(spec.contains(
            "\"fn\":container.program(1, data, 0),\"inverse\":container.program(4, data, 0)"
        ));
        assert!(spec.contains("return \"  none\\n\";"));
    }

    #[test]
    fn test_block_params_and_depths() {
        let spec = compile(
            "{{#each items as |item i|}}{{item.name}}{{i}}{{../title}}{{/each}}",
            &known(&[]),
        )
        .unwrap();
        assert!(spec.contains(
            "function(container,depth0,helpers,partials,data,blockParams,depths)"
        ));
        assert!(spec.contains(
            "(blockParams[0][0] != null ? lookupProperty(blockParams[0][0],\"name\") : blockParams[0][0])"
        ));
        assert!(spec.contains("container.lambda(blockParams[0][1], depth0)"));
        assert!(spec.contains(
            "(depths[1] != null ? lookupProperty(depths[1],\"title\") : depths[1])"
        ));
        assert!(spec.contains("container.program(1, data, 2, blockParams, depths)"));
        assert!(spec.ends_with("\"useData\":true,\"useDepths\":true,\"useBlockParams\":true}"));
    }

    #[test]
    fn test_data_and_nested_paths() {
        let spec = compile("{{@index}} {{a.b.c}}", &known(&[])).unwrap();
        assert!(spec.contains(
            "container.lambda((data && lookupProperty(data,\"index\")), depth0)"
        ));
        assert!(spec.contains(
            "((stack1 = ((stack1 = (depth0 != null ? lookupProperty(depth0,\"a\") : depth0)) != null ? lookupProperty(stack1,\"b\") : stack1)) != null ? lookupProperty(stack1,\"c\") : stack1)"
        ));
    }

    #[test]
    fn test_simple_block_uses_block_helper_missing() {
        let spec = compile("{{#section}}x{{/section}}", &known(&[])).unwrap();
        assert!(spec.contains(
            "container.hooks.blockHelperMissing.call(depth0,container.lambda((depth0 != null ? lookupProperty(depth0,\"section\") : depth0), depth0),{\"name\":\"section\",\"hash\":{},\"fn\":container.program(1, data, 0),\"inverse\":container.noop,\"data\":data,\"loc\":"
        ));
    }

    #[test]
    fn test_partials() {
        let source = "{{> header title=name}}\n  {{> item}}\n";
        let spec = compile(source, &known(&[])).unwrap();
        assert!(spec.contains(
            "container.invokePartial(lookupProperty(partials,\"header\"),depth0,{\"name\":\"header\",\"hash\":{\"title\":(depth0 != null ? lookupProperty(depth0,\"name\") : depth0)},\"data\":data,\"helpers\":helpers,\"partials\":partials,\"decorators\":container.decorators})"
        ));
        assert!(spec.contains("\"indent\":\"  \""));
        assert!(spec.contains("\"usePartial\":true"));
    }

    #[test]
    fn test_hash_literals_and_subexpressions() {
        let spec = compile(
            "{{link (concat \"/u/\" id) label='Home' count=3 flag=true}}",
            &known(&["link", "concat"]),
        )
        .unwrap();
        assert!(spec.contains(
            "lookupProperty(helpers,\"link\").call(depth0 != null ? depth0 : (container.nullContext || {}),lookupProperty(helpers,\"concat\").call(depth0 != null ? depth0 : (container.nullContext || {}),\"/u/\",(depth0 != null ? lookupProperty(depth0,\"id\") : depth0),"
        ));
        assert!(spec.contains("\"hash\":{\"label\":\"Home\",\"count\":3,\"flag\":true}"));
    }

    #[test]
    fn test_strict_mode() {
        let options = PrecompileOptions {
            strict: true,
            ..known(&[])
        };
        let spec = compile("{{a.b}}", &options).unwrap();
        assert!(spec.contains(
            "container.strict(lookupProperty(depth0,\"a\"), \"b\", {\"start\":{\"line\":1,\"column\":2},\"end\":{\"line\":1,\"column\":5}})"
        ));
    }

    #[test]
    fn test_unescaped_and_no_escape() {
        let spec = compile("{{{html}}}", &known(&[])).unwrap();
        assert!(spec.contains("return ((stack1 = container.lambda("));
        assert!(!spec.contains("escapeExpression"));

        let options = PrecompileOptions {
            no_escape: true,
            ..known(&[])
        };
        let spec = compile("{{html}}", &options).unwrap();
        assert!(!spec.contains("escapeExpression"));
    }

    #[test]
    fn test_adjacent_values_are_coerced_to_strings() {
        let spec = compile("{{{a}}}{{{b}}}", &known(&[])).unwrap();
        assert!(spec.contains("return \"\"\n    + ((stack1 = "));
    }
}
