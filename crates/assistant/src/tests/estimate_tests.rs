use super::*;

fn request(size: &str, services: Vec<AdditionalService>) -> EstimateRequest {
    EstimateRequest {
        origin: "austin".into(),
        destination: "denver".into(),
        move_size: size.into(),
        additional_services: services,
        move_date: Some("2031-05-01".into()),
    }
}

#[test]
fn classifies_common_size_phrasings() {
    assert_eq!(SizeClass::classify("Studio apartment"), Some(SizeClass::Studio));
    assert_eq!(SizeClass::classify("2 bedroom"), Some(SizeClass::TwoBedroom));
    assert_eq!(SizeClass::classify("3BHK"), Some(SizeClass::ThreeBedroom));
    assert_eq!(SizeClass::classify("one bedroom flat"), Some(SizeClass::OneBedroom));
    assert_eq!(SizeClass::classify("family house"), Some(SizeClass::FourPlus));
    assert_eq!(SizeClass::classify("small office"), Some(SizeClass::Office));
    assert_eq!(SizeClass::classify("a few boxes"), None);
}

#[test]
fn multi_digit_counts_and_embedded_number_words() {
    assert_eq!(SizeClass::classify("10 bedroom house"), Some(SizeClass::FourPlus));
    assert_eq!(SizeClass::classify("12-bedroom estate"), Some(SizeClass::FourPlus));
    assert_eq!(SizeClass::classify("none"), None);
    assert_eq!(SizeClass::classify("phone"), None);
    assert_eq!(SizeClass::classify("someone's stuff"), None);
    assert_eq!(SizeClass::classify("Two-bedroom condo"), Some(SizeClass::TwoBedroom));
}

#[tokio::test]
async fn ten_bedrooms_price_as_four_plus() {
    let estimator = RateCardEstimator::default();
    let range = estimator
        .estimate(&request("10 bedroom house", vec![]))
        .await
        .expect("estimate");
    assert_eq!(range, CostRange { min: 1955.0, max: 2645.0 });

    for size in ["none", "phone"] {
        assert_eq!(
            estimator.estimate(&request(size, vec![])).await,
            Err(EstimateError::UnknownMoveSize(size.into()))
        );
    }
}

#[tokio::test]
async fn band_surrounds_base_price() {
    let range = RateCardEstimator::default()
        .estimate(&request("2 bedroom", vec![]))
        .await
        .expect("estimate");
    assert_eq!(range, CostRange { min: 935.0, max: 1265.0 });
}

#[tokio::test]
async fn services_raise_the_estimate() {
    let estimator = RateCardEstimator::default();
    let plain = estimator
        .estimate(&request("1 bedroom", vec![]))
        .await
        .expect("plain");
    let with_services = estimator
        .estimate(&request(
            "1 bedroom",
            vec![AdditionalService::Packing, AdditionalService::Storage],
        ))
        .await
        .expect("with services");
    assert!(with_services.min > plain.min);
    assert_eq!(with_services.max, ((700.0f64 + 200.0 + 140.0) * 1.15).round());
}

#[tokio::test]
async fn unknown_size_and_blank_locations_are_rejected() {
    let estimator = RateCardEstimator::default();
    assert_eq!(
        estimator.estimate(&request("lots", vec![])).await,
        Err(EstimateError::UnknownMoveSize("lots".into()))
    );

    let mut blank = request("studio", vec![]);
    blank.destination = " ".into();
    assert_eq!(
        estimator.estimate(&blank).await,
        Err(EstimateError::MissingField("destination"))
    );
}

#[test]
fn service_costs_follow_size() {
    let costs = RateCardEstimator::default()
        .additional_service_costs("studio")
        .expect("costs");
    assert_eq!(costs, ServiceCosts { packing: 120.0, storage: 80.0 });
}
