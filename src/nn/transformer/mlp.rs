use crate::nn::{Activation, Dropout, Initializer, Linear, Mode, Module};
use crate::tensor::{Result, Tensor, TensorElem};
use num_traits::Float;
use tracing::trace;

/// Feed-forward block: `Linear(h, 4h) -> GELU -> Linear(4h, h) -> Dropout`.
#[derive(Debug, Clone)]
pub struct Mlp<T: TensorElem> {
    fc_in: Linear<T>,
    fc_out: Linear<T>,
    dropout: Dropout,
}

impl<T: TensorElem + Float> Mlp<T> {
    pub fn new(fc_in: Linear<T>, fc_out: Linear<T>, dropout: Dropout) -> Self {
        Self {
            fc_in,
            fc_out,
            dropout,
        }
    }

    pub fn init(hidden_size: usize, dropout: Dropout, init: &mut Initializer) -> Result<Self> {
        let fc_in = Linear::init(hidden_size, 4 * hidden_size, true, init)?;
        let fc_out = Linear::init(4 * hidden_size, hidden_size, true, init)?;
        Ok(Self::new(fc_in, fc_out, dropout))
    }

    pub fn fc_in(&self) -> &Linear<T> {
        &self.fc_in
    }

    pub fn fc_in_mut(&mut self) -> &mut Linear<T> {
        &mut self.fc_in
    }

    pub fn fc_out(&self) -> &Linear<T> {
        &self.fc_out
    }

    pub fn fc_out_mut(&mut self) -> &mut Linear<T> {
        &mut self.fc_out
    }

    pub fn forward(&self, x: &Tensor<T, 3>, mode: &mut Mode<'_>) -> Result<Tensor<T, 3>> {
        trace!(shape = ?x.shape(), "mlp forward");
        let h = Activation::gelu(&self.fc_in.forward(x)?)?;
        let out = self.fc_out.forward(&h)?;
        self.dropout.forward(&out, mode)
    }
}

impl<T: TensorElem> Module<T> for Mlp<T> {
    fn parameter_count(&self) -> usize {
        self.fc_in.parameter_count() + self.fc_out.parameter_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::activation::GeluCoefficients;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_mlp_shapes() {
        let mlp = Mlp::<f32>::init(8, Dropout::new(0.0).unwrap(), &mut Initializer::seeded(1))
            .unwrap();
        assert_eq!(mlp.fc_in().weight().shape(), &[32, 8]);
        assert_eq!(mlp.fc_out().weight().shape(), &[8, 32]);
        assert_eq!(mlp.parameter_count(), (32 * 8 + 32) + (8 * 32 + 8));

        let y = mlp.forward(&Tensor::ones([2, 3, 8]), &mut Mode::Eval).unwrap();
        assert_eq!(y.shape(), &[2, 3, 8]);
    }

    #[test]
    fn test_mlp_known_values() {
        // fc_in doubles a single feature into 4 copies, fc_out sums them.
        let fc_in = Linear::new(Tensor::<f32, 2>::full([4, 1], 2.0), None).unwrap();
        let fc_out = Linear::new(Tensor::<f32, 2>::ones([1, 4]), None).unwrap();
        let mlp = Mlp::new(fc_in, fc_out, Dropout::new(0.5).unwrap());

        let x = Tensor::<f32, 3>::new(vec![0.5], [1, 1, 1]).unwrap();
        let y = mlp.forward(&x, &mut Mode::Eval).unwrap();
        let expected = 4.0 * GeluCoefficients::<f32>::new().unwrap().apply(1.0);
        assert!((y.data()[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_mlp_train_mode_uses_dropout() {
        let mlp = Mlp::<f32>::init(4, Dropout::new(0.5).unwrap(), &mut Initializer::seeded(2))
            .unwrap();
        let x = Tensor::<f32, 3>::ones([1, 8, 4]);
        let eval = mlp.forward(&x, &mut Mode::Eval).unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let train = mlp.forward(&x, &mut Mode::Train(&mut rng)).unwrap();
        assert_ne!(eval, train);
        for (e, t) in eval.data().iter().zip(train.data().iter()) {
            assert!(*t == 0.0 || (t - 2.0 * e).abs() < 1e-5);
        }
    }
}
