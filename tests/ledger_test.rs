mod common;

use anyhow::Result;
use common::{ADITYA_ID, ARCHIT_ID, assert_close, registered_service, test_service};
use fuelsplit::application::AppError;
use fuelsplit::domain::{DebtDirection, LedgerError, PayRequest};

fn rejection(result: Result<impl std::fmt::Debug, AppError>) -> LedgerError {
    match result {
        Err(AppError::Ledger(err)) => err,
        other => panic!("expected a ledger rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unregistered_caller_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = rejection(service.fill("stranger", 10.0, 1000.0).await);
    assert_eq!(err, LedgerError::NotRegistered("stranger".to_string()));

    let err = rejection(service.start_ride("stranger", 0.0).await);
    assert_eq!(err, LedgerError::NotRegistered("stranger".to_string()));

    assert!(matches!(
        rejection(service.status("stranger").await),
        LedgerError::NotRegistered(_)
    ));
    Ok(())
}

#[tokio::test]
async fn test_register_invalid_bucket() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = rejection(service.register(ADITYA_ID, "Bob").await);
    assert_eq!(
        err,
        LedgerError::InvalidBucket {
            name: "Bob".to_string(),
            allowed: "Aditya, Archit".to_string(),
        }
    );
    assert_eq!(service.register(ADITYA_ID, "aditya").await?, "Aditya");
    Ok(())
}

#[tokio::test]
async fn test_ride_from_own_tank() -> Result<()> {
    let (service, _temp) = registered_service().await?;

    let fill = service.fill(ADITYA_ID, 10.0, 1000.0).await?;
    assert_close(fill.new_price, 100.0);

    // Either caller may set the shared mileage
    service.set_mileage(ARCHIT_ID, 40.0).await?;
    service.start_ride(ADITYA_ID, 0.0).await?;
    let ride = service.end_ride(ADITYA_ID, 400.0).await?;

    assert_close(ride.used_liters, 10.0);
    assert_eq!(ride.borrowed_liters, 0.0);

    let status = service.status(ADITYA_ID).await?;
    assert_eq!(
        status.tanks,
        vec![("Aditya".to_string(), 0.0), ("Archit".to_string(), 0.0)]
    );
    assert_eq!(status.direction(), DebtDirection::Settled);
    Ok(())
}

#[tokio::test]
async fn test_insufficient_fuel_keeps_ride_open() -> Result<()> {
    let (service, _temp) = registered_service().await?;
    service.fill(ADITYA_ID, 10.0, 1000.0).await?;
    service.start_ride(ADITYA_ID, 0.0).await?;
    service.end_ride(ADITYA_ID, 400.0).await?;

    service.start_ride(ADITYA_ID, 400.0).await?;
    let err = rejection(service.end_ride(ADITYA_ID, 440.0).await);
    match err {
        LedgerError::InsufficientFuel { used, available } => {
            assert_close(used, 1.0);
            assert_close(available, 0.0);
        }
        other => panic!("expected InsufficientFuel, got {:?}", other),
    }

    // Refuel and end the same ride without starting it again
    service.fill(ARCHIT_ID, 5.0, 500.0).await?;
    let ride = service.end_ride(ADITYA_ID, 440.0).await?;
    assert_close(ride.borrowed_liters, 1.0);
    Ok(())
}

#[tokio::test]
async fn test_borrow_settle_and_pay() -> Result<()> {
    let (service, _temp) = registered_service().await?;
    service.fill(ARCHIT_ID, 20.0, 2000.0).await?;

    service.start_ride(ADITYA_ID, 0.0).await?;
    let ride = service.end_ride(ADITYA_ID, 40.0).await?;
    assert_close(ride.borrowed_liters, 1.0);
    assert_eq!(ride.other_bucket, "Archit");

    let settle = service.settle(ADITYA_ID).await?;
    assert_close(settle.liters_owed, 1.0);
    assert_close(settle.cash_value, 100.0);

    let from_archit = service.status(ARCHIT_ID).await?;
    assert_eq!(from_archit.direction(), DebtDirection::OtherOwes);
    assert_close(from_archit.net_debt_cash(), 100.0);

    let pay = service.pay(ADITYA_ID, PayRequest::Cash(40.0)).await?;
    assert_close(pay.cleared_liters, 0.4);
    assert_close(pay.remaining_debt, 0.6);

    let pay = service.pay(ADITYA_ID, PayRequest::Full).await?;
    assert_close(pay.cleared_liters, 0.6);

    let status = service.status(ADITYA_ID).await?;
    assert_eq!(status.direction(), DebtDirection::Settled);
    assert_close(status.tanks[1].1, 20.0);

    assert_eq!(
        rejection(service.pay(ADITYA_ID, PayRequest::Full).await),
        LedgerError::NoDebt
    );
    Ok(())
}

#[tokio::test]
async fn test_settle_and_pay_need_price() -> Result<()> {
    let (service, _temp) = registered_service().await?;

    assert_eq!(
        rejection(service.settle(ADITYA_ID).await),
        LedgerError::NoPriceSet
    );
    assert_eq!(
        rejection(service.pay(ADITYA_ID, PayRequest::Cash(100.0)).await),
        LedgerError::NoPriceSet
    );
    Ok(())
}

#[tokio::test]
async fn test_fill_repays_debt_to_lender_tank() -> Result<()> {
    let (service, _temp) = registered_service().await?;
    service.fill(ARCHIT_ID, 20.0, 2000.0).await?;
    service.start_ride(ADITYA_ID, 0.0).await?;
    service.end_ride(ADITYA_ID, 160.0).await?; // 4 L borrowed

    let fill = service.fill(ADITYA_ID, 10.0, 1050.0).await?;

    assert_close(fill.cleared_liters, 4.0);
    assert_close(fill.remaining_liters, 6.0);
    let status = service.status(ADITYA_ID).await?;
    assert_close(status.tanks[0].1, 6.0);
    assert_close(status.tanks[1].1, 20.0);
    assert_close(status.last_price_per_liter, 105.0);
    assert_eq!(status.direction(), DebtDirection::Settled);
    Ok(())
}

#[tokio::test]
async fn test_reset_clears_registrations() -> Result<()> {
    let (service, _temp) = registered_service().await?;
    service.fill(ADITYA_ID, 10.0, 1000.0).await?;
    service.set_mileage(ADITYA_ID, 55.0).await?;

    service.reset().await?;

    assert!(matches!(
        rejection(service.status(ADITYA_ID).await),
        LedgerError::NotRegistered(_)
    ));

    service.register(ADITYA_ID, "Aditya").await?;
    let status = service.status(ADITYA_ID).await?;
    assert_eq!(status.tanks[0].1, 0.0);
    assert_eq!(status.tanks[1].1, 0.0);
    assert_eq!(status.mileage_km_per_liter, 40.0);
    assert_eq!(status.last_price_per_liter, 0.0);
    Ok(())
}
