use proc_macro::TokenStream;
use quote::{format_ident, quote};
use std::collections::HashMap;
use syn::{Attribute, Data, DeriveInput, Fields, Meta, Token, Type, parse_macro_input};

/// Helper enum for parsed attribute values
enum MetaValue {
    Str(String),
    List(Vec<String>),
    Expr(syn::Expr),
    Flag,
}

/// Main macro for declaring a typed environment struct
///
/// Every field carries `#[var(env = "KEY", types("type", ...))]` plus one of
/// `required`, `default = expr`, or nothing (the field must then be an
/// `Option<T>`). `doc = "..."` is accepted for documentation only.
#[proc_macro]
pub fn define_env(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match generate_env(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate_env(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let struct_name = &input.ident;
    let vis = &input.vis;
    let struct_attrs = &input.attrs;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "define_env! only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "define_env! only supports structs",
            ));
        }
    };

    let mut field_defs = Vec::new();
    let mut declare_stmts = Vec::new();
    let mut default_stmts = Vec::new();
    let mut extract_stmts = Vec::new();
    let mut field_inits = Vec::new();

    for field in fields {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "fields must be named"))?;
        let field_vis = &field.vis;
        let field_type = &field.ty;

        let config = parse_var_config(field)?;

        // Keep everything but our own #[var(...)] on the generated field
        let kept_attrs: Vec<&Attribute> = field
            .attrs
            .iter()
            .filter(|attr| !attr.path().is_ident("var"))
            .collect();
        field_defs.push(quote! {
            #(#kept_attrs)*
            #field_vis #field_name: #field_type
        });

        let env_var = &config.env_var;
        let types = &config.types;

        let declare = match config.mode {
            VarMode::Required => quote! {
                parser.require(#env_var, [#(#types),*]);
            },
            VarMode::Default(ref default_expr) => {
                default_stmts.push(quote! {
                    defaults.insert(
                        #env_var.to_string(),
                        ::typenv::Value::from(#default_expr),
                    );
                });
                quote! {
                    parser.define(#env_var, [#(#types),*]);
                    parser.set_default(#env_var, ::typenv::Value::from(#default_expr));
                }
            }
            VarMode::Optional => {
                if !is_option(field_type) {
                    return Err(syn::Error::new_spanned(
                        field,
                        "fields without `required` or `default` must have type Option<T>",
                    ));
                }
                quote! {
                    parser.define(#env_var, [#(#types),*]);
                }
            }
        };
        declare_stmts.push(declare);

        // Prefixed so field names cannot shadow the generated locals
        let binding = format_ident!("__field_{}", field_name);
        extract_stmts.push(quote! {
            let #binding = if failed.contains(&#env_var) {
                None
            } else {
                match result.extract::<#field_type>(#env_var) {
                    Ok(value) => Some(value),
                    Err(err) => {
                        errors.push(err);
                        None
                    }
                }
            };
        });
        field_inits.push(quote! {
            #field_name: #binding?
        });
    }

    let struct_def = quote! {
        #(#struct_attrs)*
        #vis struct #struct_name {
            #(#field_defs),*
        }
    };

    let inherent_impl = quote! {
        impl #struct_name {
            /// Default values declared on the fields
            pub fn defaults() -> ::typenv::EnvMap {
                #[allow(unused_mut)]
                let mut defaults = ::typenv::EnvMap::new();
                #(#default_stmts)*
                defaults
            }

            /// Build the struct from an already resolved environment
            pub fn from_result(
                result: &::typenv::EnvResult,
            ) -> Result<Self, Vec<::typenv::ConfigError>> {
                let mut errors: Vec<::typenv::ConfigError> = result
                    .errors()
                    .iter()
                    .cloned()
                    .map(::typenv::ConfigError::from)
                    .collect();
                // Keys that already failed type checking are not converted again
                let failed: Vec<&str> = result.errors().iter().map(|e| e.key.as_str()).collect();

                #(#extract_stmts)*

                let build = || -> Option<Self> {
                    Some(Self {
                        #(#field_inits),*
                    })
                };
                match build() {
                    Some(loaded) if errors.is_empty() => Ok(loaded),
                    _ => Err(errors),
                }
            }
        }
    };

    let load_impl = quote! {
        impl ::typenv::Load for #struct_name {
            fn load_or_error() -> Result<Self, Vec<::typenv::ConfigError>> {
                let _ = ::typenv::__private::dotenvy::dotenv();
                let result = <Self as ::typenv::Load>::parser()
                    .parse_env(Self::defaults(), &[])
                    .map_err(|failure| vec![failure.into_error()])?;
                Self::from_result(&result)
            }

            fn parser() -> ::typenv::EnvironmentParser {
                let mut parser = ::typenv::EnvironmentParser::new();
                #(#declare_stmts)*
                parser
            }
        }
    };

    Ok(quote! {
        #struct_def
        #inherent_impl
        #load_impl
    })
}

#[derive(Debug)]
struct VarConfig {
    env_var: String,
    types: Vec<String>,
    mode: VarMode,
}

#[derive(Debug)]
enum VarMode {
    Required,
    Default(syn::Expr),
    Optional,
}

/// Parse #[var(env = "X", types("a", "b"), default = val)] syntax
fn parse_var_list(meta_list: &syn::MetaList) -> syn::Result<HashMap<String, MetaValue>> {
    let mut values = HashMap::new();

    meta_list.parse_nested_meta(|meta| {
        let key = meta
            .path
            .get_ident()
            .ok_or_else(|| meta.error("expected identifier"))?
            .to_string();

        if key == "types" && meta.input.peek(syn::token::Paren) {
            let content;
            syn::parenthesized!(content in meta.input);
            let names = content.parse_terminated(
                <syn::LitStr as syn::parse::Parse>::parse,
                Token![,],
            )?;
            values.insert(
                key,
                MetaValue::List(names.iter().map(syn::LitStr::value).collect()),
            );
        } else if meta.input.peek(Token![=]) {
            meta.input.parse::<Token![=]>()?;

            if key == "env" || key == "doc" || key == "types" {
                let value: syn::LitStr = meta.input.parse()?;
                values.insert(key, MetaValue::Str(value.value()));
            } else {
                let expr: syn::Expr = meta.input.parse()?;
                values.insert(key, MetaValue::Expr(expr));
            }
        } else {
            values.insert(key, MetaValue::Flag);
        }

        Ok(())
    })?;

    Ok(values)
}

fn parse_var_config(field: &syn::Field) -> syn::Result<VarConfig> {
    let var_attr = field
        .attrs
        .iter()
        .find(|attr| attr.path().is_ident("var"))
        .ok_or_else(|| {
            syn::Error::new_spanned(
                field,
                "field must have a #[var(env = \"...\", types(...))] attribute",
            )
        })?;

    let parsed = match &var_attr.meta {
        Meta::List(list) => parse_var_list(list)?,
        _ => {
            return Err(syn::Error::new_spanned(
                var_attr,
                "var attribute must be a list: #[var(env = \"...\", ...)]",
            ));
        }
    };

    let env_var = match parsed.get("env") {
        Some(MetaValue::Str(s)) => s.clone(),
        _ => {
            return Err(syn::Error::new_spanned(
                var_attr,
                "var must have env = \"VAR_NAME\"",
            ));
        }
    };

    let types = match parsed.get("types") {
        Some(MetaValue::List(names)) if !names.is_empty() => names.clone(),
        Some(MetaValue::Str(name)) => vec![name.clone()],
        _ => {
            return Err(syn::Error::new_spanned(
                var_attr,
                "var must have types(\"type\", ...) with at least one type",
            ));
        }
    };

    let mode = if parsed.contains_key("required") {
        VarMode::Required
    } else if let Some(MetaValue::Expr(e)) = parsed.get("default") {
        VarMode::Default(e.clone())
    } else {
        VarMode::Optional
    };

    Ok(VarConfig {
        env_var,
        types,
        mode,
    })
}

/// Whether the type is spelled `Option<T>`
fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}
