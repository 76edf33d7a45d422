//! Tree-walking evaluator
//!
//! Evaluates statements and expressions directly from the AST in the running
//! execution context. Parameter defaults are always evaluated here, whatever
//! the active strategy.

use super::function::ScriptFunction;
use super::runtime::{binary_operation, describe_value, name_anonymous_function, unary_operation};
use super::{Completion, Interpreter};
use crate::ast::{
    Argument, BindingTarget, Expression, FunctionBody, Literal, MemberProperty, Statement, UnaryOp,
    VariableDeclaration, VariableKind,
};
use crate::compiler::is_anonymous_function_definition;
use crate::env::Environment;
use crate::error::{ErrorType, JsError};
use crate::hoist::BlockScope;
use crate::value::{
    CheapClone, JsString, JsValue, PropertyKey, array_like_to_vec, create_array, create_object,
};

impl Interpreter {
    /// Evaluate a function body in the running (callee) context
    pub(crate) fn evaluate_function_body(&mut self, func: &ScriptFunction) -> Result<Completion, JsError> {
        let node = func.node().cheap_clone();
        match &node.body {
            FunctionBody::Block(statements) => self.evaluate_statements(statements),
            FunctionBody::Expression(expr) => Ok(Completion::Return(self.evaluate_expression(expr)?)),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Statements
    // ═══════════════════════════════════════════════════════════════════════════════

    /// Run a statement list; a `Normal` result carries the last expression value
    pub(crate) fn evaluate_statements(&mut self, statements: &[Statement]) -> Result<Completion, JsError> {
        let mut last = None;
        for stmt in statements {
            match self.evaluate_statement(stmt)? {
                Completion::Normal(Some(value)) => last = Some(value),
                Completion::Normal(None) => {}
                ret @ Completion::Return(_) => return Ok(ret),
            }
        }
        Ok(Completion::Normal(last))
    }

    fn evaluate_statement(&mut self, stmt: &Statement) -> Result<Completion, JsError> {
        match stmt {
            Statement::Expression(expr) => Ok(Completion::Normal(Some(self.evaluate_expression(expr)?))),

            Statement::VariableDeclaration(decl) => {
                self.evaluate_variable_declaration(decl)?;
                Ok(Completion::Normal(None))
            }

            // Instantiated on scope entry
            Statement::FunctionDeclaration(decl) => {
                if decl.annex_b_hoisted.get() {
                    self.copy_annex_b_function(&decl.name)?;
                }
                Ok(Completion::Normal(None))
            }

            Statement::ClassDeclaration(class) => {
                let heritage = self.evaluate_heritage(class.heritage.as_ref())?;
                let constructor = self.class_definition_evaluation(class, heritage)?;
                if let Some(name) = &class.name {
                    self.initialize_lexical_binding(name, JsValue::Object(constructor));
                }
                Ok(Completion::Normal(None))
            }

            Statement::Return(arg) => {
                let value = match arg {
                    Some(expr) => self.evaluate_expression(expr)?,
                    None => JsValue::Undefined,
                };
                Ok(Completion::Return(value))
            }

            Statement::Throw(expr) => {
                let value = self.evaluate_expression(expr)?;
                Err(JsError::thrown(value))
            }

            Statement::If(if_stmt) => {
                if self.evaluate_expression(&if_stmt.test)?.to_boolean() {
                    self.evaluate_substatement(&if_stmt.consequent)
                } else if let Some(alternate) = &if_stmt.alternate {
                    self.evaluate_substatement(alternate)
                } else {
                    Ok(Completion::Normal(None))
                }
            }

            Statement::While(while_stmt) => {
                let mut last = None;
                while self.evaluate_expression(&while_stmt.test)?.to_boolean() {
                    match self.evaluate_substatement(&while_stmt.body)? {
                        Completion::Normal(value) => last = value.or(last),
                        ret @ Completion::Return(_) => return Ok(ret),
                    }
                }
                Ok(Completion::Normal(last))
            }

            Statement::Block(block) => self.evaluate_block(&block.body),

            Statement::Empty => Ok(Completion::Normal(None)),
        }
    }

    /// A bare function declaration as an `if`/`while` body acts as a block
    fn evaluate_substatement(&mut self, stmt: &Statement) -> Result<Completion, JsError> {
        if matches!(stmt, Statement::FunctionDeclaration(_)) {
            self.evaluate_block(std::slice::from_ref(stmt))
        } else {
            self.evaluate_statement(stmt)
        }
    }

    fn evaluate_block(&mut self, body: &[Statement]) -> Result<Completion, JsError> {
        let scope = BlockScope::of(body);
        if scope.is_empty() {
            return self.evaluate_statements(body);
        }
        let outer = self.lexical_environment();
        let block_env = Environment::new_declarative(Some(outer.cheap_clone()));
        self.block_declaration_instantiation(&scope, &block_env);
        self.set_lexical_environment(block_env);
        let result = self.evaluate_statements(body);
        self.set_lexical_environment(outer);
        result
    }

    fn evaluate_variable_declaration(&mut self, decl: &VariableDeclaration) -> Result<(), JsError> {
        for declarator in &decl.declarations {
            if decl.kind == VariableKind::Var && declarator.init.is_none() {
                continue;
            }
            let value = match &declarator.init {
                Some(init) => self.evaluate_initializer(init, &declarator.target)?,
                None => JsValue::Undefined,
            };
            if decl.kind == VariableKind::Var {
                self.binding_initialization(&declarator.target, value, None)?;
            } else {
                let env = self.lexical_environment();
                self.binding_initialization(&declarator.target, value, Some(&env))?;
            }
        }
        Ok(())
    }

    /// Evaluate an initializer, naming anonymous functions after a simple target
    pub(crate) fn evaluate_initializer(
        &mut self,
        init: &Expression,
        target: &BindingTarget,
    ) -> Result<JsValue, JsError> {
        match target {
            BindingTarget::Name(name) => self.evaluate_named(init, name),
            BindingTarget::Pattern(_) => self.evaluate_expression(init),
        }
    }

    /// NamedEvaluation
    fn evaluate_named(&mut self, expr: &Expression, name: &JsString) -> Result<JsValue, JsError> {
        let value = self.evaluate_expression(expr)?;
        if is_anonymous_function_definition(expr) {
            name_anonymous_function(&value, name);
        }
        Ok(value)
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Expressions
    // ═══════════════════════════════════════════════════════════════════════════════

    pub(crate) fn evaluate_expression(&mut self, expr: &Expression) -> Result<JsValue, JsError> {
        match expr {
            Expression::Literal(lit) => Ok(match lit {
                Literal::Undefined => JsValue::Undefined,
                Literal::Null => JsValue::Null,
                Literal::Boolean(b) => JsValue::Boolean(*b),
                Literal::Number(n) => JsValue::Number(*n),
                Literal::String(s) => JsValue::String(s.cheap_clone()),
            }),

            Expression::Identifier(name) => self.identifier_value(name),

            Expression::This => self.resolve_this_binding(),

            Expression::NewTarget => Ok(self.new_target_value()),

            Expression::Array(elements) => {
                let items = self.evaluate_arguments(elements)?;
                let realm = self.realm_or_fatal();
                Ok(JsValue::Object(create_array(
                    realm.intrinsics().array_prototype.cheap_clone(),
                    items,
                )))
            }

            Expression::Object(props) => {
                let realm = self.realm_or_fatal();
                let obj = create_object(Some(realm.intrinsics().object_prototype.cheap_clone()));
                for (key, value) in props {
                    let value = self.evaluate_named(value, key)?;
                    obj.borrow_mut().set_property(PropertyKey::from(key.cheap_clone()), value);
                }
                Ok(JsValue::Object(obj))
            }

            Expression::Function(node) => Ok(JsValue::Object(self.instantiate_function_expression(node))),

            Expression::Class(class) => {
                let heritage = self.evaluate_heritage(class.heritage.as_ref())?;
                Ok(JsValue::Object(self.class_definition_evaluation(class, heritage)?))
            }

            Expression::Unary(UnaryOp::Typeof, operand) if matches!(**operand, Expression::Identifier(_)) => {
                match &**operand {
                    Expression::Identifier(name) => self.typeof_identifier(name),
                    _ => Ok(JsValue::Undefined),
                }
            }

            Expression::Unary(op, operand) => {
                let value = self.evaluate_expression(operand)?;
                Ok(unary_operation(*op, &value))
            }

            Expression::Binary(op, left, right) => {
                let left = self.evaluate_expression(left)?;
                let right = self.evaluate_expression(right)?;
                Ok(binary_operation(*op, &left, &right))
            }

            Expression::Assign(target, value) => self.evaluate_assignment(target, value),

            Expression::Member(object, property) => {
                let base = self.evaluate_expression(object)?;
                let key = self.evaluate_property_key(property)?;
                self.get_value_property(&base, &key)
            }

            Expression::SuperMember(name) => self.super_property(name),

            Expression::Call(callee, args) => self.evaluate_call(callee, args),

            Expression::New(callee, args) => {
                let constructor = self.evaluate_expression(callee)?;
                let args = self.evaluate_arguments(args)?;
                let is_constructor = constructor
                    .as_object()
                    .is_some_and(|obj| obj.borrow().is_constructor());
                if !is_constructor {
                    return Err(JsError::type_error(
                        ErrorType::NotAConstructor,
                        describe_value(&constructor),
                    ));
                }
                self.construct(&constructor, &args, None)
            }

            Expression::SuperCall(args) => {
                let args = self.evaluate_arguments(args)?;
                self.super_call(&args)
            }

            Expression::Yield(_) => Err(JsError::not_implemented("yield in tree-walking mode")),

            Expression::Await(operand) => {
                let value = self.evaluate_expression(operand)?;
                self.await_value(value)
            }
        }
    }

    fn evaluate_property_key(&mut self, property: &MemberProperty) -> Result<PropertyKey, JsError> {
        Ok(match property {
            MemberProperty::Named(name) => PropertyKey::from(name.cheap_clone()),
            MemberProperty::Computed(expr) => PropertyKey::from_value(&self.evaluate_expression(expr)?),
        })
    }

    fn evaluate_assignment(&mut self, target: &Expression, value: &Expression) -> Result<JsValue, JsError> {
        match target {
            Expression::Identifier(name) => {
                let value = self.evaluate_named(value, name)?;
                self.assign_identifier(name, value.clone())?;
                Ok(value)
            }
            Expression::Member(object, property) => {
                let base = self.evaluate_expression(object)?;
                let key = self.evaluate_property_key(property)?;
                let value = self.evaluate_expression(value)?;
                self.put_value_property(&base, key, value.clone())?;
                Ok(value)
            }
            _ => Err(JsError::not_implemented("assignment to this target")),
        }
    }

    fn evaluate_call(&mut self, callee: &Expression, args: &[Argument]) -> Result<JsValue, JsError> {
        let (function, this) = match callee {
            Expression::Member(object, property) => {
                let base = self.evaluate_expression(object)?;
                let key = self.evaluate_property_key(property)?;
                (self.get_value_property(&base, &key)?, base)
            }
            Expression::SuperMember(name) => (self.super_property(name)?, self.resolve_this_binding()?),
            _ => (self.evaluate_expression(callee)?, JsValue::Undefined),
        };
        let args = self.evaluate_arguments(args)?;
        if !function.is_callable() {
            return Err(JsError::type_error(ErrorType::NotAFunction, describe_value(&function)));
        }
        self.call(&function, this, &args)
    }

    /// ArgumentListEvaluation with spread
    fn evaluate_arguments(&mut self, args: &[Argument]) -> Result<Vec<JsValue>, JsError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Argument::Expression(expr) => values.push(self.evaluate_expression(expr)?),
                Argument::Spread(expr) => {
                    let value = self.evaluate_expression(expr)?;
                    let JsValue::Object(source) = &value else {
                        return Err(JsError::type_error(ErrorType::NotAnObject, value.to_js_string()));
                    };
                    values.extend(array_like_to_vec(source)?);
                }
            }
        }
        Ok(values)
    }

    fn evaluate_heritage(&mut self, heritage: Option<&Expression>) -> Result<Option<JsValue>, JsError> {
        heritage.map(|expr| self.evaluate_expression(expr)).transpose()
    }
}
