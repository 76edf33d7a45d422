//! Declaration instantiation
//!
//! Creates and initializes every binding a body needs before its first
//! statement runs: parameters, the `arguments` object, hoisted `var`s,
//! top-level functions, lexical declarations and the Annex B copies of
//! block-level functions. The environments created here become the running
//! context's lexical and variable environments.

use super::Interpreter;
use super::arguments::{create_mapped_arguments_object, create_unmapped_arguments_object};
use super::function::{ClosureParts, ScriptFunction, ThisMode};
use crate::ast::{BindingPattern, BindingTarget, FunctionBody, Script};
use crate::env::{EnvRef, Environment, set_identifier_value};
use crate::error::{ErrorType, JsError};
use crate::hoist::{
    BlockScope, LexicalDeclaration, annex_b_function_candidates, has_lexical_declarations,
    lexically_declared_names, lexically_scoped_declarations, var_declared_names,
    var_scoped_function_declarations,
};
use crate::prelude::*;
use crate::value::{
    CheapClone, JsObjectRef, JsString, JsValue, PropertyKey, array_like_to_vec, create_array, get,
};

impl Interpreter {
    /// FunctionDeclarationInstantiation for the running callee context
    pub fn function_declaration_instantiation(
        &mut self,
        function_object: &JsObjectRef,
        func: &ScriptFunction,
        args: &[JsValue],
    ) -> Result<(), JsError> {
        let node = func.node().cheap_clone();
        let strict = func.is_strict();
        let body = node.body.statements();
        let has_block_body = matches!(node.body, FunctionBody::Block(_));

        // Parameter shape
        let mut parameter_names: IndexSet<JsString> = index_set_new();
        let mut has_duplicates = false;
        let mut has_parameter_expressions = false;
        for parameter in &node.parameters {
            if parameter.default_value.is_some() || parameter.target.contains_expression() {
                has_parameter_expressions = true;
            }
            for name in parameter.target.bound_names() {
                if !parameter_names.insert(name) {
                    has_duplicates = true;
                }
            }
        }

        let mut arguments_object_needed = node.might_need_arguments_object;
        if func.this_mode() == ThisMode::Lexical || parameter_names.contains("arguments") {
            arguments_object_needed = false;
        }

        // Last declaration of a name wins
        let mut function_names: FxHashSet<JsString> = FxHashSet::default();
        let mut functions_to_initialize = Vec::new();
        if has_block_body {
            for decl in var_scoped_function_declarations(body).into_iter().rev() {
                if function_names.insert(decl.name.cheap_clone()) {
                    functions_to_initialize.push(decl);
                }
            }
            if !has_parameter_expressions && function_names.contains("arguments") {
                arguments_object_needed = false;
            }
            if !has_parameter_expressions
                && arguments_object_needed
                && lexically_declared_names(body).iter().any(|n| n.as_str() == "arguments")
            {
                arguments_object_needed = false;
            }
        } else {
            arguments_object_needed = false;
        }

        // Parameter bindings
        let callee_env = self.lexical_environment();
        let env = if strict || !has_parameter_expressions {
            callee_env
        } else {
            // Defaults must not see body declarations
            let env = Environment::new_declarative(Some(callee_env));
            self.set_lexical_environment(env.cheap_clone());
            env
        };

        for name in &parameter_names {
            let mut env = env.borrow_mut();
            if env.has_binding(name) {
                continue;
            }
            env.create_mutable_binding(name.cheap_clone());
            if has_duplicates {
                env.initialize_binding(name, JsValue::Undefined);
            }
        }

        if arguments_object_needed {
            let realm = self.realm_or_fatal();
            let arguments = if strict || !func.has_simple_parameter_list() {
                create_unmapped_arguments_object(&realm, args)
            } else {
                create_mapped_arguments_object(
                    &realm,
                    function_object,
                    func.formal_parameters(),
                    args,
                    &env,
                )
            };
            let name = JsString::from("arguments");
            let mut env = env.borrow_mut();
            if strict {
                env.create_immutable_binding(name.cheap_clone(), false);
            } else {
                env.create_mutable_binding(name.cheap_clone());
            }
            env.initialize_binding(&name, JsValue::Object(arguments));
            parameter_names.insert(name);
        }

        // IteratorBindingInitialization over the argument list
        let realm = self.realm_or_fatal();
        for (i, parameter) in node.parameters.iter().enumerate() {
            let value = if parameter.is_rest {
                let rest = args.get(i..).map(<[JsValue]>::to_vec).unwrap_or_default();
                JsValue::Object(create_array(realm.intrinsics().array_prototype.cheap_clone(), rest))
            } else {
                match args.get(i) {
                    Some(arg) if !arg.is_undefined() => arg.clone(),
                    _ => match &parameter.default_value {
                        Some(default) => self.evaluate_initializer(default, &parameter.target)?,
                        None => JsValue::Undefined,
                    },
                }
            };
            let used_env = if has_duplicates { None } else { Some(&env) };
            self.binding_initialization(&parameter.target, value, used_env)?;
        }

        // Var bindings
        let mut instantiated_var_names: FxHashSet<JsString> = FxHashSet::default();
        let var_names = if has_block_body {
            var_declared_names(body)
        } else {
            Vec::new()
        };
        let var_env = if !has_parameter_expressions {
            for name in var_names {
                if parameter_names.contains(&name) || !instantiated_var_names.insert(name.cheap_clone()) {
                    continue;
                }
                let mut env = env.borrow_mut();
                env.create_mutable_binding(name.cheap_clone());
                env.initialize_binding(&name, JsValue::Undefined);
            }
            env.cheap_clone()
        } else {
            // A separate var environment keeps parameter closures from seeing body vars
            let var_env = Environment::new_declarative(Some(env.cheap_clone()));
            self.set_variable_environment(var_env.cheap_clone());
            for name in var_names {
                if !instantiated_var_names.insert(name.cheap_clone()) {
                    continue;
                }
                let initial_value = if !parameter_names.contains(&name) || function_names.contains(&name) {
                    JsValue::Undefined
                } else {
                    env.borrow().get_binding_value(&name, false)?
                };
                let mut var_env = var_env.borrow_mut();
                var_env.create_mutable_binding(name.cheap_clone());
                var_env.initialize_binding(&name, initial_value);
            }
            var_env
        };

        // Annex B: block-level functions also get a var binding
        if !strict && has_block_body {
            for decl in annex_b_function_candidates(body) {
                if parameter_names.contains(&decl.name) {
                    continue;
                }
                if !instantiated_var_names.contains(&decl.name) && decl.name.as_str() != "arguments" {
                    let mut var_env = var_env.borrow_mut();
                    var_env.create_mutable_binding(decl.name.cheap_clone());
                    var_env.initialize_binding(&decl.name, JsValue::Undefined);
                    instantiated_var_names.insert(decl.name.cheap_clone());
                }
                decl.annex_b_hoisted.set(true);
            }
        }

        // Lexical bindings; strict bodies share the var environment
        let lex_env = if strict || (!node.contains_direct_eval && !has_lexical_declarations(body)) {
            var_env.cheap_clone()
        } else {
            Environment::new_declarative(Some(var_env.cheap_clone()))
        };
        self.set_lexical_environment(lex_env.cheap_clone());
        create_lexical_bindings(&lex_env, &lexically_scoped_declarations(body));

        let private_environment = func.private_environment().cloned();
        for decl in functions_to_initialize {
            let closure = self.create_closure(
                ClosureParts::new(decl.function.cheap_clone(), lex_env.cheap_clone())
                    .private_environment(private_environment.clone())
                    .strict(strict),
            );
            var_env
                .borrow_mut()
                .set_mutable_binding(&decl.name, JsValue::Object(closure), false)?;
        }

        tracing::trace!(
            function = %func.name(),
            parameters = parameter_names.len(),
            vars = instantiated_var_names.len(),
            separate_var_env = has_parameter_expressions,
            arguments_object = arguments_object_needed,
            "function declaration instantiation"
        );
        Ok(())
    }

    /// BlockDeclarationInstantiation into a fresh block environment
    pub(crate) fn block_declaration_instantiation(&self, scope: &BlockScope, env: &EnvRef) {
        create_lexical_bindings(env, &scope.lexical);
        let strict = self.is_strict();
        let private_environment = self.running_context().and_then(|c| c.private_environment.clone());
        for decl in &scope.functions {
            let closure = self.create_closure(
                ClosureParts::new(decl.function.cheap_clone(), env.cheap_clone())
                    .private_environment(private_environment.clone())
                    .strict(strict),
            );
            // Repeated sloppy declarations in one block: the last one wins
            let mut env = env.borrow_mut();
            if !env.has_binding(&decl.name) {
                env.create_mutable_binding(decl.name.cheap_clone());
            }
            env.initialize_binding(&decl.name, JsValue::Object(closure));
        }
    }

    /// GlobalDeclarationInstantiation into the running global environment
    pub(crate) fn global_declaration_instantiation(&mut self, script: &Script) -> Result<(), JsError> {
        let env = self.lexical_environment();
        let body = &script.body;

        let lexical_names = lexically_declared_names(body);
        for name in &lexical_names {
            if env.borrow().has_binding(name) {
                return Err(JsError::syntax_error(ErrorType::Redeclaration, name));
            }
        }

        for name in var_declared_names(body) {
            if env.borrow().has_lexical_declaration(&name) {
                return Err(JsError::syntax_error(ErrorType::Redeclaration, &name));
            }
        }

        let mut declared_function_names: FxHashSet<JsString> = FxHashSet::default();
        let mut functions_to_initialize = Vec::new();
        for decl in var_scoped_function_declarations(body).into_iter().rev() {
            if declared_function_names.insert(decl.name.cheap_clone()) {
                functions_to_initialize.push(decl);
            }
        }

        let mut declared_var_names: IndexSet<JsString> = index_set_new();
        for name in var_declared_names(body) {
            if !declared_function_names.contains(&name) {
                declared_var_names.insert(name);
            }
        }

        if !script.is_strict {
            for decl in annex_b_function_candidates(body) {
                if env.borrow().has_lexical_declaration(&decl.name) {
                    continue;
                }
                if !declared_function_names.contains(&decl.name) && !declared_var_names.contains(&decl.name) {
                    declared_var_names.insert(decl.name.cheap_clone());
                }
                decl.annex_b_hoisted.set(true);
            }
        }

        create_lexical_bindings(&env, &lexically_scoped_declarations(body));

        for decl in functions_to_initialize {
            let closure = self.create_closure(
                ClosureParts::new(decl.function.cheap_clone(), env.cheap_clone()).strict(script.is_strict),
            );
            let mut env = env.borrow_mut();
            if env.has_binding(&decl.name) {
                env.set_mutable_binding(&decl.name, JsValue::Object(closure), false)?;
            } else {
                env.create_mutable_binding(decl.name.cheap_clone());
                env.initialize_binding(&decl.name, JsValue::Object(closure));
            }
            env.record_var_name(decl.name.cheap_clone());
        }

        for name in declared_var_names {
            let mut env = env.borrow_mut();
            if !env.has_binding(&name) {
                env.create_mutable_binding(name.cheap_clone());
                env.initialize_binding(&name, JsValue::Undefined);
            }
            env.record_var_name(name);
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // BindingInitialization
    // ═══════════════════════════════════════════════════════════════════════════════

    /// Bind `value` to a target.
    ///
    /// With an environment the names are initialized there; without one
    /// they are assigned through the running lexical environment.
    pub(crate) fn binding_initialization(
        &mut self,
        target: &BindingTarget,
        value: JsValue,
        env: Option<&EnvRef>,
    ) -> Result<(), JsError> {
        match target {
            BindingTarget::Name(name) => {
                match env {
                    Some(env) => env.borrow_mut().initialize_binding(name, value),
                    None => {
                        let lexical = self.lexical_environment();
                        set_identifier_value(&lexical, name, value, self.is_strict())?;
                    }
                }
                Ok(())
            }
            BindingTarget::Pattern(pattern) => match pattern.as_ref() {
                BindingPattern::Object(properties) => {
                    let source = self.to_object(&value)?;
                    for property in properties {
                        let mut item = get(&source, &PropertyKey::from(property.key.cheap_clone()))?;
                        if item.is_undefined()
                            && let Some(default) = &property.default_value
                        {
                            item = self.evaluate_initializer(default, &property.target)?;
                        }
                        self.binding_initialization(&property.target, item, env)?;
                    }
                    Ok(())
                }
                BindingPattern::Array(elements) => {
                    let source = self.to_object(&value)?;
                    let items = array_like_to_vec(&source)?;
                    for (i, element) in elements.iter().enumerate() {
                        let Some(element) = element else {
                            continue;
                        };
                        let item = if element.is_rest {
                            let rest = items.get(i..).map(<[JsValue]>::to_vec).unwrap_or_default();
                            let realm = self.realm_or_fatal();
                            JsValue::Object(create_array(
                                realm.intrinsics().array_prototype.cheap_clone(),
                                rest,
                            ))
                        } else {
                            match items.get(i) {
                                Some(item) if !item.is_undefined() => item.clone(),
                                _ => match &element.default_value {
                                    Some(default) => self.evaluate_initializer(default, &element.target)?,
                                    None => JsValue::Undefined,
                                },
                            }
                        };
                        self.binding_initialization(&element.target, item, env)?;
                    }
                    Ok(())
                }
            },
        }
    }
}

fn create_lexical_bindings(env: &EnvRef, declarations: &[LexicalDeclaration]) {
    let mut env = env.borrow_mut();
    for declaration in declarations {
        for name in &declaration.names {
            if declaration.is_constant {
                env.create_immutable_binding(name.cheap_clone(), true);
            } else {
                env.create_mutable_binding(name.cheap_clone());
            }
        }
    }
}
