/// Обучение классификатора на фиксированных путях и параметрах

use device_price_ml::{logging, pipeline::training, pipeline::TrainingPlan};

fn main() -> anyhow::Result<()> {
    logging::init();

    let plan = TrainingPlan::default();
    let report = training::run(&plan)?;

    if let Some(last) = report.history.last() {
        tracing::info!(
            "Final epoch {}: loss {:.4}, accuracy {:.4}",
            last.epoch,
            last.loss,
            last.accuracy
        );
    }

    tracing::info!(
        "Validation loss {:.4}, accuracy {:.4}; model saved to {}, history to {}",
        report.evaluation.loss,
        report.evaluation.accuracy,
        report.model_path.display(),
        report.history_path.display()
    );
    Ok(())
}
