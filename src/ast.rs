//! Abstract Syntax Tree types for function bodies
//!
//! The engine never parses source text. Hosts (and the test-suite) hand it
//! trees built from these types, usually through the [`build`] helpers.
//! Function nodes are shared behind `Rc` so every closure created from the
//! same node borrows one body.

use crate::hoist;
use crate::prelude::*;
use crate::value::JsString;

/// A complete script
#[derive(Debug, Clone)]
pub struct Script {
    pub body: Vec<Statement>,
    pub is_strict: bool,
}

// ============ STATEMENTS ============

#[derive(Debug, Clone)]
pub enum Statement {
    // Declarations
    VariableDeclaration(VariableDeclaration),
    FunctionDeclaration(Rc<FunctionDeclaration>),
    ClassDeclaration(Rc<ClassNode>),

    // Control Flow
    Block(BlockStatement),
    If(IfStatement),
    While(WhileStatement),

    // Jump
    Return(Option<Expression>),
    Throw(Expression),

    // Other
    Expression(Expression),
    Empty,
}

#[derive(Debug, Clone)]
pub struct BlockStatement {
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub struct IfStatement {
    pub test: Expression,
    pub consequent: Box<Statement>,
    pub alternate: Option<Box<Statement>>,
}

#[derive(Debug, Clone)]
pub struct WhileStatement {
    pub test: Expression,
    pub body: Box<Statement>,
}

#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    pub kind: VariableKind,
    pub declarations: Vec<VariableDeclarator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone)]
pub struct VariableDeclarator {
    pub target: BindingTarget,
    pub init: Option<Expression>,
}

/// A hoistable `function` declaration.
///
/// `annex_b_hoisted` is set during declaration instantiation when a
/// block-level declaration also receives a function-scoped `var` binding;
/// evaluating the declaration then copies the block binding outward.
#[derive(Debug)]
pub struct FunctionDeclaration {
    pub name: JsString,
    pub function: Rc<FunctionNode>,
    pub annex_b_hoisted: Cell<bool>,
}

// ============ FUNCTIONS ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum FunctionKind {
    Regular,
    Generator,
    Async,
}

/// Everything the engine needs to know about one function literal.
///
/// `function_length` and `might_need_arguments_object` are derived from the
/// parameters and body when the node is created.
#[derive(Debug)]
pub struct FunctionNode {
    pub name: Option<JsString>,
    pub parameters: Vec<FunctionParameter>,
    pub body: FunctionBody,
    pub kind: FunctionKind,
    pub is_strict: bool,
    pub is_arrow: bool,
    pub function_length: u32,
    pub might_need_arguments_object: bool,
    pub contains_direct_eval: bool,
}

#[derive(Debug)]
pub enum FunctionBody {
    Block(Vec<Statement>),
    /// Concise body (`x => x + 1`, field initializers)
    Expression(Expression),
}

impl FunctionBody {
    /// The statement list of a block body; concise bodies have none.
    pub fn statements(&self) -> &[Statement] {
        match self {
            FunctionBody::Block(body) => body,
            FunctionBody::Expression(_) => &[],
        }
    }
}

impl FunctionNode {
    pub fn new(
        name: Option<JsString>,
        parameters: Vec<FunctionParameter>,
        body: FunctionBody,
        is_arrow: bool,
    ) -> Self {
        let function_length = parameters
            .iter()
            .take_while(|p| !p.is_rest && p.default_value.is_none())
            .count() as u32;
        let is_strict = hoist::has_use_strict_directive(body.statements());
        let might_need_arguments_object = hoist::references_arguments(&parameters, &body);
        Self {
            name,
            parameters,
            body,
            kind: FunctionKind::Regular,
            is_strict,
            is_arrow,
            function_length,
            might_need_arguments_object,
            contains_direct_eval: false,
        }
    }

    pub fn strict(mut self) -> Self {
        self.is_strict = true;
        self
    }

    pub fn generator(mut self) -> Self {
        self.kind = FunctionKind::Generator;
        self
    }

    pub fn async_(mut self) -> Self {
        self.kind = FunctionKind::Async;
        self
    }

    /// Mark the body as containing a direct `eval` call.
    pub fn with_direct_eval(mut self) -> Self {
        self.contains_direct_eval = true;
        self
    }

    /// True iff no parameter is a rest parameter, has a default, or is a pattern.
    pub fn has_simple_parameter_list(&self) -> bool {
        self.parameters.iter().all(|p| {
            !p.is_rest && p.default_value.is_none() && matches!(p.target, BindingTarget::Name(_))
        })
    }
}

#[derive(Debug, Clone)]
pub struct FunctionParameter {
    pub target: BindingTarget,
    pub default_value: Option<Expression>,
    pub is_rest: bool,
}

// ============ PATTERNS ============

#[derive(Debug, Clone)]
pub enum BindingTarget {
    Name(JsString),
    Pattern(Rc<BindingPattern>),
}

#[derive(Debug, Clone)]
pub enum BindingPattern {
    Object(Vec<ObjectPatternProperty>),
    Array(Vec<Option<ArrayPatternElement>>),
}

#[derive(Debug, Clone)]
pub struct ObjectPatternProperty {
    pub key: JsString,
    pub target: BindingTarget,
    pub default_value: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct ArrayPatternElement {
    pub target: BindingTarget,
    pub default_value: Option<Expression>,
    pub is_rest: bool,
}

impl BindingTarget {
    /// BoundNames, in source order
    pub fn bound_names(&self) -> Vec<JsString> {
        let mut names = Vec::new();
        self.collect_bound_names(&mut names);
        names
    }

    fn collect_bound_names(&self, names: &mut Vec<JsString>) {
        match self {
            BindingTarget::Name(name) => names.push(name.clone()),
            BindingTarget::Pattern(pattern) => match pattern.as_ref() {
                BindingPattern::Object(props) => {
                    for prop in props {
                        prop.target.collect_bound_names(names);
                    }
                }
                BindingPattern::Array(elements) => {
                    for element in elements.iter().flatten() {
                        element.target.collect_bound_names(names);
                    }
                }
            },
        }
    }

    /// Whether binding this target evaluates any expression (defaults).
    pub fn contains_expression(&self) -> bool {
        match self {
            BindingTarget::Name(_) => false,
            BindingTarget::Pattern(pattern) => match pattern.as_ref() {
                BindingPattern::Object(props) => props
                    .iter()
                    .any(|p| p.default_value.is_some() || p.target.contains_expression()),
                BindingPattern::Array(elements) => elements
                    .iter()
                    .flatten()
                    .any(|e| e.default_value.is_some() || e.target.contains_expression()),
            },
        }
    }
}

// ============ CLASSES ============

#[derive(Debug)]
pub struct ClassNode {
    pub name: Option<JsString>,
    pub heritage: Option<Expression>,
    pub constructor: Option<Rc<FunctionNode>>,
    pub methods: Vec<ClassMethod>,
    pub fields: Vec<ClassField>,
}

#[derive(Debug)]
pub struct ClassMethod {
    pub key: JsString,
    pub function: Rc<FunctionNode>,
    pub is_static: bool,
}

/// Instance field; the initializer is a concise-bodied function called with
/// the instance as `this`.
#[derive(Debug)]
pub struct ClassField {
    pub key: JsString,
    pub initializer: Option<Rc<FunctionNode>>,
}

// ============ EXPRESSIONS ============

#[derive(Debug, Clone)]
pub enum Expression {
    Literal(Literal),
    Identifier(JsString),
    This,
    NewTarget,
    Array(Vec<Argument>),
    Object(Vec<(JsString, Expression)>),
    Function(Rc<FunctionNode>),
    Class(Rc<ClassNode>),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Assign(Box<Expression>, Box<Expression>),
    Member(Box<Expression>, MemberProperty),
    SuperMember(JsString),
    Call(Box<Expression>, Vec<Argument>),
    New(Box<Expression>, Vec<Argument>),
    SuperCall(Vec<Argument>),
    Yield(Option<Box<Expression>>),
    Await(Box<Expression>),
}

#[derive(Debug, Clone)]
pub enum Literal {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
}

#[derive(Debug, Clone)]
pub enum MemberProperty {
    Named(JsString),
    Computed(Box<Expression>),
}

#[derive(Debug, Clone)]
pub enum Argument {
    Expression(Expression),
    Spread(Expression),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum UnaryOp {
    Not,
    Minus,
    Typeof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Lt,
    StrictEq,
    StrictNotEq,
}

/// Constructors for building trees by hand.
pub mod build {
    use super::*;

    // Expressions

    pub fn num(n: f64) -> Expression {
        Expression::Literal(Literal::Number(n))
    }

    pub fn str(s: &str) -> Expression {
        Expression::Literal(Literal::String(JsString::from(s)))
    }

    pub fn boolean(b: bool) -> Expression {
        Expression::Literal(Literal::Boolean(b))
    }

    pub fn undefined() -> Expression {
        Expression::Literal(Literal::Undefined)
    }

    pub fn null() -> Expression {
        Expression::Literal(Literal::Null)
    }

    pub fn ident(name: &str) -> Expression {
        Expression::Identifier(JsString::from(name))
    }

    pub fn this() -> Expression {
        Expression::This
    }

    pub fn new_target() -> Expression {
        Expression::NewTarget
    }

    fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
        Expression::Binary(op, Box::new(left), Box::new(right))
    }

    pub fn add(left: Expression, right: Expression) -> Expression {
        binary(BinaryOp::Add, left, right)
    }

    pub fn sub(left: Expression, right: Expression) -> Expression {
        binary(BinaryOp::Sub, left, right)
    }

    pub fn mul(left: Expression, right: Expression) -> Expression {
        binary(BinaryOp::Mul, left, right)
    }

    pub fn lt(left: Expression, right: Expression) -> Expression {
        binary(BinaryOp::Lt, left, right)
    }

    pub fn strict_eq(left: Expression, right: Expression) -> Expression {
        binary(BinaryOp::StrictEq, left, right)
    }

    pub fn strict_ne(left: Expression, right: Expression) -> Expression {
        binary(BinaryOp::StrictNotEq, left, right)
    }

    pub fn not(e: Expression) -> Expression {
        Expression::Unary(UnaryOp::Not, Box::new(e))
    }

    pub fn neg(e: Expression) -> Expression {
        Expression::Unary(UnaryOp::Minus, Box::new(e))
    }

    pub fn type_of(e: Expression) -> Expression {
        Expression::Unary(UnaryOp::Typeof, Box::new(e))
    }

    pub fn assign(target: Expression, value: Expression) -> Expression {
        Expression::Assign(Box::new(target), Box::new(value))
    }

    pub fn member(object: Expression, name: &str) -> Expression {
        Expression::Member(Box::new(object), MemberProperty::Named(JsString::from(name)))
    }

    pub fn index(object: Expression, key: Expression) -> Expression {
        Expression::Member(Box::new(object), MemberProperty::Computed(Box::new(key)))
    }

    pub fn super_member(name: &str) -> Expression {
        Expression::SuperMember(JsString::from(name))
    }

    fn arguments(args: Vec<Expression>) -> Vec<Argument> {
        args.into_iter().map(Argument::Expression).collect()
    }

    pub fn call(callee: Expression, args: Vec<Expression>) -> Expression {
        Expression::Call(Box::new(callee), arguments(args))
    }

    /// Call with an explicit argument list (for spread arguments)
    pub fn call_with(callee: Expression, args: Vec<Argument>) -> Expression {
        Expression::Call(Box::new(callee), args)
    }

    pub fn new_expr(callee: Expression, args: Vec<Expression>) -> Expression {
        Expression::New(Box::new(callee), arguments(args))
    }

    pub fn super_call(args: Vec<Argument>) -> Expression {
        Expression::SuperCall(args)
    }

    pub fn arg(e: Expression) -> Argument {
        Argument::Expression(e)
    }

    pub fn spread(e: Expression) -> Argument {
        Argument::Spread(e)
    }

    pub fn array(elements: Vec<Expression>) -> Expression {
        Expression::Array(arguments(elements))
    }

    pub fn object(props: Vec<(&str, Expression)>) -> Expression {
        Expression::Object(
            props
                .into_iter()
                .map(|(k, v)| (JsString::from(k), v))
                .collect(),
        )
    }

    pub fn yield_(e: Expression) -> Expression {
        Expression::Yield(Some(Box::new(e)))
    }

    pub fn await_(e: Expression) -> Expression {
        Expression::Await(Box::new(e))
    }

    pub fn function_expr(node: FunctionNode) -> Expression {
        Expression::Function(Rc::new(node))
    }

    pub fn class_expr(node: ClassNode) -> Expression {
        Expression::Class(Rc::new(node))
    }

    // Statements

    pub fn expr(e: Expression) -> Statement {
        Statement::Expression(e)
    }

    pub fn ret(e: Expression) -> Statement {
        Statement::Return(Some(e))
    }

    pub fn ret_void() -> Statement {
        Statement::Return(None)
    }

    pub fn throw(e: Expression) -> Statement {
        Statement::Throw(e)
    }

    fn declaration(kind: VariableKind, target: BindingTarget, init: Option<Expression>) -> Statement {
        Statement::VariableDeclaration(VariableDeclaration {
            kind,
            declarations: vec![VariableDeclarator { target, init }],
        })
    }

    pub fn var(name: &str, init: Option<Expression>) -> Statement {
        declaration(VariableKind::Var, name_target(name), init)
    }

    pub fn let_(name: &str, init: Option<Expression>) -> Statement {
        declaration(VariableKind::Let, name_target(name), init)
    }

    pub fn const_(name: &str, init: Expression) -> Statement {
        declaration(VariableKind::Const, name_target(name), Some(init))
    }

    pub fn var_pattern(kind: VariableKind, target: BindingTarget, init: Expression) -> Statement {
        declaration(kind, target, Some(init))
    }

    pub fn block(body: Vec<Statement>) -> Statement {
        Statement::Block(BlockStatement { body })
    }

    pub fn if_(test: Expression, consequent: Statement, alternate: Option<Statement>) -> Statement {
        Statement::If(IfStatement {
            test,
            consequent: Box::new(consequent),
            alternate: alternate.map(Box::new),
        })
    }

    pub fn while_(test: Expression, body: Statement) -> Statement {
        Statement::While(WhileStatement {
            test,
            body: Box::new(body),
        })
    }

    /// `function name(...) { ... }`; the node's own name is overwritten.
    pub fn function_decl(name: &str, mut node: FunctionNode) -> Statement {
        let name = JsString::from(name);
        node.name = Some(name.clone());
        Statement::FunctionDeclaration(Rc::new(FunctionDeclaration {
            name,
            function: Rc::new(node),
            annex_b_hoisted: Cell::new(false),
        }))
    }

    pub fn class_decl(node: ClassNode) -> Statement {
        Statement::ClassDeclaration(Rc::new(node))
    }

    pub fn script(body: Vec<Statement>) -> Script {
        let is_strict = hoist::has_use_strict_directive(&body);
        Script { body, is_strict }
    }

    pub fn strict_script(body: Vec<Statement>) -> Script {
        Script {
            body,
            is_strict: true,
        }
    }

    // Parameters and patterns

    pub fn name_target(name: &str) -> BindingTarget {
        BindingTarget::Name(JsString::from(name))
    }

    pub fn param(name: &str) -> FunctionParameter {
        FunctionParameter {
            target: name_target(name),
            default_value: None,
            is_rest: false,
        }
    }

    pub fn param_default(name: &str, default_value: Expression) -> FunctionParameter {
        FunctionParameter {
            target: name_target(name),
            default_value: Some(default_value),
            is_rest: false,
        }
    }

    pub fn rest(name: &str) -> FunctionParameter {
        FunctionParameter {
            target: name_target(name),
            default_value: None,
            is_rest: true,
        }
    }

    pub fn param_pattern(pattern: BindingPattern, default_value: Option<Expression>) -> FunctionParameter {
        FunctionParameter {
            target: BindingTarget::Pattern(Rc::new(pattern)),
            default_value,
            is_rest: false,
        }
    }

    /// `{ key: target = default, ... }`
    pub fn object_pattern(props: Vec<(&str, BindingTarget, Option<Expression>)>) -> BindingPattern {
        BindingPattern::Object(
            props
                .into_iter()
                .map(|(key, target, default_value)| ObjectPatternProperty {
                    key: JsString::from(key),
                    target,
                    default_value,
                })
                .collect(),
        )
    }

    /// `[a, b = default, ...rest]`; `None` is an elision
    pub fn array_pattern(elements: Vec<Option<ArrayPatternElement>>) -> BindingPattern {
        BindingPattern::Array(elements)
    }

    pub fn element(name: &str, default_value: Option<Expression>) -> Option<ArrayPatternElement> {
        Some(ArrayPatternElement {
            target: name_target(name),
            default_value,
            is_rest: false,
        })
    }

    pub fn rest_element(name: &str) -> Option<ArrayPatternElement> {
        Some(ArrayPatternElement {
            target: name_target(name),
            default_value: None,
            is_rest: true,
        })
    }

    pub fn pattern(pattern: BindingPattern) -> BindingTarget {
        BindingTarget::Pattern(Rc::new(pattern))
    }

    // Functions

    pub fn function(name: Option<&str>, parameters: Vec<FunctionParameter>, body: Vec<Statement>) -> FunctionNode {
        FunctionNode::new(
            name.map(JsString::from),
            parameters,
            FunctionBody::Block(body),
            false,
        )
    }

    pub fn arrow(parameters: Vec<FunctionParameter>, body: Vec<Statement>) -> FunctionNode {
        FunctionNode::new(None, parameters, FunctionBody::Block(body), true)
    }

    pub fn arrow_expr(parameters: Vec<FunctionParameter>, body: Expression) -> FunctionNode {
        FunctionNode::new(None, parameters, FunctionBody::Expression(body), true)
    }

    // Classes

    pub fn class(name: Option<&str>) -> ClassNode {
        ClassNode {
            name: name.map(JsString::from),
            heritage: None,
            constructor: None,
            methods: Vec::new(),
            fields: Vec::new(),
        }
    }

    impl ClassNode {
        pub fn extends(mut self, heritage: Expression) -> Self {
            self.heritage = Some(heritage);
            self
        }

        pub fn constructor(mut self, node: FunctionNode) -> Self {
            self.constructor = Some(Rc::new(node.strict()));
            self
        }

        pub fn method(mut self, key: &str, node: FunctionNode) -> Self {
            self.methods.push(ClassMethod {
                key: JsString::from(key),
                function: Rc::new(node.strict()),
                is_static: false,
            });
            self
        }

        pub fn static_method(mut self, key: &str, node: FunctionNode) -> Self {
            self.methods.push(ClassMethod {
                key: JsString::from(key),
                function: Rc::new(node.strict()),
                is_static: true,
            });
            self
        }

        pub fn field(mut self, key: &str, initializer: Option<Expression>) -> Self {
            let initializer = initializer.map(|init| {
                Rc::new(
                    FunctionNode::new(
                        Some(JsString::from(key)),
                        Vec::new(),
                        FunctionBody::Expression(init),
                        false,
                    )
                    .strict(),
                )
            });
            self.fields.push(ClassField {
                key: JsString::from(key),
                initializer,
            });
            self
        }
    }
}
