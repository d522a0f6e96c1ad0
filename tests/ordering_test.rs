//! Tests for declaration-order execution, short-circuiting, and chain reuse.

use std::sync::Arc;

use async_trait::async_trait;
use chainflow::{ChainBuilder, Handler, Next, Outcome, Registry, StepError};
use tokio::sync::Mutex;

type Log = Arc<Mutex<Vec<&'static str>>>;

#[derive(Clone)]
struct Item;

#[derive(Default)]
struct First {
    log: Log,
}

#[async_trait]
impl Handler<Item> for First {
    fn name(&self) -> &'static str {
        "first"
    }

    async fn handle(&self, message: Item, next: Next<Item>) -> Result<(), StepError> {
        self.log.lock().await.push("first");
        next(message).await?;
        Ok(())
    }
}

#[derive(Default)]
struct Second {
    log: Log,
}

#[async_trait]
impl Handler<Item> for Second {
    fn name(&self) -> &'static str {
        "second"
    }

    async fn handle(&self, message: Item, next: Next<Item>) -> Result<(), StepError> {
        self.log.lock().await.push("second");
        next(message).await?;
        Ok(())
    }
}

#[derive(Default)]
struct Third {
    log: Log,
}

#[async_trait]
impl Handler<Item> for Third {
    fn name(&self) -> &'static str {
        "third"
    }

    async fn handle(&self, message: Item, next: Next<Item>) -> Result<(), StepError> {
        self.log.lock().await.push("third");
        next(message).await?;
        Ok(())
    }
}

/// Records itself, then withholds the continuation.
#[derive(Default)]
struct StopsChain {
    log: Log,
}

#[async_trait]
impl Handler<Item> for StopsChain {
    fn name(&self) -> &'static str {
        "stops_chain"
    }

    async fn handle(&self, _message: Item, _next: Next<Item>) -> Result<(), StepError> {
        self.log.lock().await.push("stops_chain");
        Ok(())
    }
}

fn registry(log: &Log) -> Registry {
    Registry::new()
        .singleton(First { log: log.clone() })
        .singleton(Second { log: log.clone() })
        .singleton(Third { log: log.clone() })
        .singleton(StopsChain { log: log.clone() })
}

#[tokio::test]
async fn steps_run_once_each_in_declaration_order() {
    let log: Log = Log::default();
    let chain = ChainBuilder::new()
        .add_step::<First>()
        .add_step::<Second>()
        .add_step::<Third>()
        .build_with(registry(&log))
        .unwrap();

    let outcome = chain.run(Item).await.unwrap();

    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(*log.lock().await, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn withheld_continuation_skips_every_later_step() {
    let log: Log = Log::default();
    let chain = ChainBuilder::new()
        .add_step::<First>()
        .add_step::<StopsChain>()
        .add_step::<Third>()
        .build_with(registry(&log))
        .unwrap();

    let outcome = chain.run(Item).await.unwrap();

    // Stopping early is a successful run, reported as Stopped.
    assert_eq!(outcome, Outcome::Stopped);
    assert_eq!(*log.lock().await, vec!["first", "stops_chain"]);
}

#[tokio::test]
async fn empty_chain_completes_immediately() {
    let chain = ChainBuilder::<Item>::new().build().unwrap();
    let outcome = chain.run(Item).await.unwrap();
    assert_eq!(outcome, Outcome::Completed);
}

#[tokio::test]
async fn same_builder_compiles_to_equivalent_independent_chains() {
    let builder = ChainBuilder::new().add_step::<First>().add_step::<Second>();

    let first_log: Log = Log::default();
    let second_log: Log = Log::default();
    let one = builder.build_with(registry(&first_log)).unwrap();
    let two = builder.build_with(registry(&second_log)).unwrap();

    one.run(Item).await.unwrap();
    one.run(Item).await.unwrap();
    two.run(Item).await.unwrap();

    assert_eq!(
        *first_log.lock().await,
        vec!["first", "second", "first", "second"]
    );
    assert_eq!(*second_log.lock().await, vec!["first", "second"]);
}

#[tokio::test]
async fn chain_instance_supports_concurrent_runs() {
    let log: Log = Log::default();
    let chain = Arc::new(
        ChainBuilder::new()
            .add_step::<First>()
            .add_step::<Second>()
            .build_with(registry(&log))
            .unwrap(),
    );

    let (a, b) = tokio::join!(chain.run(Item), chain.run(Item));
    assert_eq!(a.unwrap(), Outcome::Completed);
    assert_eq!(b.unwrap(), Outcome::Completed);
    assert_eq!(log.lock().await.len(), 4);
}

mod car_chain {
    //! The car-validation chain: steps decide per message whether to continue.

    use super::*;

    #[derive(Clone)]
    struct Car {
        year: u32,
        model: &'static str,
        seen: Log,
    }

    #[derive(Default)]
    struct YearCheck;

    #[async_trait]
    impl Handler<Car> for YearCheck {
        fn name(&self) -> &'static str {
            "year_check"
        }

        async fn handle(&self, message: Car, next: Next<Car>) -> Result<(), StepError> {
            message.seen.lock().await.push("year_check");
            if message.year > 1960 {
                next(message).await?;
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct ModelCheck;

    #[async_trait]
    impl Handler<Car> for ModelCheck {
        fn name(&self) -> &'static str {
            "model_check"
        }

        async fn handle(&self, message: Car, next: Next<Car>) -> Result<(), StepError> {
            message.seen.lock().await.push("model_check");
            if message.model == "Foo" {
                next(message).await?;
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn recent_matching_car_passes_both_checks() {
        let seen: Log = Log::default();
        let chain = ChainBuilder::new()
            .add_step::<YearCheck>()
            .add_step::<ModelCheck>()
            .build()
            .unwrap();

        let outcome = chain
            .run(Car {
                year: 2024,
                model: "Foo",
                seen: seen.clone(),
            })
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(*seen.lock().await, vec!["year_check", "model_check"]);
    }

    #[tokio::test]
    async fn old_car_short_circuits_without_failing() {
        let seen: Log = Log::default();
        let chain = ChainBuilder::new()
            .add_step::<YearCheck>()
            .add_step::<ModelCheck>()
            .build()
            .unwrap();

        let outcome = chain
            .run(Car {
                year: 1950,
                model: "Foo",
                seen: seen.clone(),
            })
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Stopped);
        assert_eq!(*seen.lock().await, vec!["year_check"]);
    }
}
