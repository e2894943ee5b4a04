use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, Ident, ItemFn, LitStr};

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Marks a function as a test and routes its `tracing` output to the test
/// writer, so logs only show up for failing tests.
///
/// The optional argument is the default log level, `info` when omitted.
/// `RUST_LOG` still overrides it.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let input = parse_macro_input!(item as ItemFn);

  if let Some(asyncness) = input.sig.asyncness {
    return TokenStream::from(
      syn::Error::new(
        asyncness.span(),
        "rxflow_macro::test does not run async tests. Use #[tokio::test] and \
         drive the stream with a scheduler instead.",
      )
      .to_compile_error(),
    );
  }

  let raw_args = proc_macro2::TokenStream::from(attr);
  let level = if raw_args.is_empty() {
    "info".to_string()
  } else if let Ok(ident) = syn::parse2::<Ident>(raw_args.clone()) {
    let level = ident.to_string();
    if !LEVELS.contains(&level.as_str()) {
      return TokenStream::from(
        syn::Error::new(
          ident.span(),
          "rxflow_macro::test only accepts: #[rxflow_macro::test], or a level \
           out of trace, debug, info, warn, error",
        )
        .to_compile_error(),
      );
    }
    level
  } else if let Ok(lit) = syn::parse2::<LitStr>(raw_args.clone()) {
    let level = lit.value();
    if !LEVELS.contains(&level.as_str()) {
      return TokenStream::from(
        syn::Error::new(
          lit.span(),
          "rxflow_macro::test only accepts a level out of \"trace\", \
           \"debug\", \"info\", \"warn\", \"error\" when passing a string",
        )
        .to_compile_error(),
      );
    }
    level
  } else {
    return TokenStream::from(
      syn::Error::new(
        raw_args.span(),
        "rxflow_macro::test only accepts: #[rxflow_macro::test], \
         #[rxflow_macro::test(debug)], or string equivalents",
      )
      .to_compile_error(),
    );
  };

  let ItemFn { attrs, vis, sig, block } = input;
  let stmts = &block.stmts;

  let expanded = quote! {
      #[test]
      #(#attrs)*
      #vis #sig {
        {
          let filter = ::tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| ::tracing_subscriber::EnvFilter::new(#level));
          let _ = ::tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
        }
        #(#stmts)*
      }
  };

  TokenStream::from(expanded)
}
