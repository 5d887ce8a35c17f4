pub use mediator::DefaultAsyncMediator;

use crate::features::shared::LookupContext;

pub mod middleware;

pub type AppMediator = DefaultAsyncMediator;

pub fn build_mediator(ctx: LookupContext) -> AppMediator {
    DefaultAsyncMediator::builder()
        // Lookup
        .add_handler({
            let ctx = ctx.clone();
            move |query| {
                let ctx = ctx.clone();
                async move {
                    crate::features::lookup::queries::resolve_record::handle(ctx, query).await
                }
            }
        })
        // Data diagnostics
        .add_handler({
            let ctx = ctx.clone();
            move |query| {
                let store = ctx.store.clone();
                async move {
                    crate::features::data::queries::table_sizes::handle(store, query).await
                }
            }
        })
        .add_handler({
            let ctx = ctx.clone();
            move |query| {
                let store = ctx.store.clone();
                async move {
                    crate::features::data::queries::table_samples::handle(store, query).await
                }
            }
        })
        .build()
}
