//! Attribute macros for the `concurrent` task scheduler.
//!
//! Both macros turn an `async fn` into a plain function that creates a
//! scheduler, runs the body as its first task and blocks until it settles.
//! Inside the body, `?` propagates `concurrent::Error` out of the task.

use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Removes the `async` keyword and returns the position of the body.
fn split_body(tokens: &mut Vec<TokenTree>) -> Option<(usize, String)> {
    if let Some(pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    {
        tokens.remove(pos);
    }

    let pos = tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))?;

    let TokenTree::Group(group) = &tokens[pos] else {
        return None;
    };

    Some((pos, group.stream().to_string()))
}

/// Builds the statements that run `block` as a task to completion.
fn scheduled(block: &str) -> String {
    format!(
        "let __scheduler = ::concurrent::TaskScheduler::new();
        let __task = ::concurrent::Task::new(async move {{
            let __value = {{ {block} }};
            ::core::result::Result::Ok::<_, ::concurrent::Error>(__value)
        }});

        if let ::core::result::Result::Err(error) = __scheduler.start(&__task) {{
            ::core::panic!(\"failed to start main task: {{error}}\");
        }}

        match __scheduler.block_on(__task) {{
            ::core::result::Result::Ok(value) => value,
            ::core::result::Result::Err(error) => ::core::panic!(\"main task failed: {{error}}\"),
        }}"
    )
}

fn replace_body(mut tokens: Vec<TokenTree>, pos: usize, body: String) -> TokenStream {
    match body.parse::<TokenStream>() {
        Ok(stream) => {
            tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, stream));
            tokens.into_iter().collect()
        }
        Err(err) => {
            let msg = format!("concurrent macro error: {err}");
            format!("compile_error!({msg:?});")
                .parse()
                .unwrap_or_default()
        }
    }
}

/// Runs an `async fn main` on a fresh scheduler.
///
/// ```rust,ignore
/// #[concurrent::main]
/// async fn main() {
///     Timer::from_millis(10).await_timeout().await?;
///     println!("done");
/// }
/// ```
///
/// The process panics if the body fails.
#[proc_macro_attribute]
pub fn main(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let Some((pos, block)) = split_body(&mut tokens) else {
        return TokenStream::new();
    };

    replace_body(tokens, pos, format!("{{ {} }}", scheduled(&block)))
}

/// Runs an `async fn` test on a fresh scheduler.
///
/// A failing body fails the test.
#[proc_macro_attribute]
pub fn test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let Some((pos, block)) = split_body(&mut tokens) else {
        return TokenStream::new();
    };

    let body = format!("{{ {} ; }}", scheduled(&block));

    let test_attr: TokenStream = "#[test]"
        .parse()
        .unwrap_or_default();

    let mut result: Vec<TokenTree> = test_attr.into_iter().collect();
    result.extend(replace_body(tokens, pos, body));
    result.into_iter().collect()
}
